//! Value types for the flow-shop scheduling problem: problem input
//! (`Instance`/`Job`), schedule output (`ScheduleResult`/`TaskLog`), and the
//! crate's single error type.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A job in a problem instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Externally visible job identifier. Must be unique within an
    /// `Instance`.
    pub id: i64,
    /// Processing time of this job at each stage, indexed by `stage_id`.
    pub processing_times: Vec<f64>,
}

impl Job {
    /// Sum of processing times across all stages.
    #[must_use]
    pub fn total_processing_time(&self) -> f64 {
        self.processing_times.iter().sum()
    }
}

/// An immutable problem instance: the shop topology, the jobs to schedule,
/// and the knobs that govern the search-based optimizers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    pub num_jobs: usize,
    pub num_stages: usize,
    /// Number of identical parallel machines at each stage, indexed by
    /// `stage_id`. Length must equal `num_stages`.
    pub machines_per_stage: Vec<usize>,
    pub jobs: Vec<Job>,

    /// Total objective evaluations (Random/Bayesian) or generations (GA).
    pub max_iterations: usize,
    /// Seed for the search RNG. `None` draws from the OS for a
    /// nondeterministic run.
    pub random_seed: Option<u64>,

    pub ga_population_size: usize,
    pub ga_mutation_rate: f64,
    pub ga_tournament_size: usize,
    pub ga_elitism_count: usize,
}

impl Instance {
    /// Validates every invariant from the data model in one pass.
    ///
    /// # Errors
    /// Returns `ScheduleError::InvalidInstance` describing the first
    /// violation found.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.num_jobs == 0 {
            return Err(ScheduleError::InvalidInstance(
                "num_jobs must be at least 1".into(),
            ));
        }
        if self.num_stages == 0 {
            return Err(ScheduleError::InvalidInstance(
                "num_stages must be at least 1".into(),
            ));
        }
        if self.machines_per_stage.len() != self.num_stages {
            return Err(ScheduleError::InvalidInstance(format!(
                "machines_per_stage has length {} but num_stages is {}",
                self.machines_per_stage.len(),
                self.num_stages
            )));
        }
        if let Some((stage, &count)) = self
            .machines_per_stage
            .iter()
            .enumerate()
            .find(|&(_, &c)| c == 0)
        {
            return Err(ScheduleError::InvalidInstance(format!(
                "stage {stage} has {count} machines, must be at least 1"
            )));
        }
        if self.jobs.len() != self.num_jobs {
            return Err(ScheduleError::InvalidInstance(format!(
                "jobs has length {} but num_jobs is {}",
                self.jobs.len(),
                self.num_jobs
            )));
        }
        for job in &self.jobs {
            if job.processing_times.len() != self.num_stages {
                return Err(ScheduleError::InvalidInstance(format!(
                    "job {} has {} processing times but num_stages is {}",
                    job.id,
                    job.processing_times.len(),
                    self.num_stages
                )));
            }
            if let Some(&p) = job.processing_times.iter().find(|&&p| p < 0.0) {
                return Err(ScheduleError::InvalidInstance(format!(
                    "job {} has negative processing time {p}",
                    job.id
                )));
            }
        }
        let unique_ids: HashSet<i64> = self.jobs.iter().map(|j| j.id).collect();
        if unique_ids.len() != self.jobs.len() {
            return Err(ScheduleError::InvalidInstance(
                "job ids must be unique".into(),
            ));
        }
        if self.max_iterations == 0 {
            // Zero iterations is legal for Random (falls back to identity)
            // but still a valid instance; search layers decide what to do.
        }
        if !(0.0..=1.0).contains(&self.ga_mutation_rate) {
            return Err(ScheduleError::InvalidInstance(format!(
                "ga_mutation_rate must be in [0,1], got {}",
                self.ga_mutation_rate
            )));
        }
        if self.ga_population_size < 2 {
            return Err(ScheduleError::InvalidInstance(
                "ga_population_size must be at least 2".into(),
            ));
        }
        if self.ga_tournament_size < 2 {
            return Err(ScheduleError::InvalidInstance(
                "ga_tournament_size must be at least 2".into(),
            ));
        }
        if self.ga_tournament_size > self.ga_population_size {
            return Err(ScheduleError::InvalidInstance(
                "ga_tournament_size must not exceed ga_population_size".into(),
            ));
        }
        if self.ga_elitism_count > self.ga_population_size {
            return Err(ScheduleError::InvalidInstance(
                "ga_elitism_count must not exceed ga_population_size".into(),
            ));
        }
        Ok(())
    }

    /// The job ids in input order, i.e. the identity permutation.
    #[must_use]
    pub fn identity_permutation(&self) -> Vec<i64> {
        self.jobs.iter().map(|j| j.id).collect()
    }

    /// Checks that `permutation` is a bijection onto this instance's job
    /// ids.
    ///
    /// # Errors
    /// Returns `ScheduleError::InvalidPermutation` if it is not.
    pub fn validate_permutation(&self, permutation: &[i64]) -> Result<(), ScheduleError> {
        if permutation.len() != self.num_jobs {
            return Err(ScheduleError::InvalidPermutation(format!(
                "permutation has length {} but num_jobs is {}",
                permutation.len(),
                self.num_jobs
            )));
        }
        let expected: HashSet<i64> = self.jobs.iter().map(|j| j.id).collect();
        let given: HashSet<i64> = permutation.iter().copied().collect();
        if given.len() != permutation.len() || given != expected {
            return Err(ScheduleError::InvalidPermutation(
                "permutation is not a bijection onto the instance's job ids".into(),
            ));
        }
        Ok(())
    }
}

/// One (job, stage) execution record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskLog {
    pub job_id: i64,
    pub stage_id: usize,
    pub machine_id: usize,
    pub global_machine_id: usize,
    pub start_time: f64,
    pub end_time: f64,
}

impl TaskLog {
    #[must_use]
    pub fn processing_time(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// The result of simulating (or searching for) a schedule: the makespan,
/// the full per-(job, stage) log, and the permutation that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub makespan: f64,
    pub schedule: Vec<TaskLog>,
    pub permutation: Vec<i64>,
}

/// The single error type for this crate's public API.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid instance: {0}")]
    InvalidInstance(String),
    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),
    #[error("unknown optimization method: {0}")]
    UnknownMethod(String),
    #[error("search aborted: {0}")]
    SearchAborted(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
