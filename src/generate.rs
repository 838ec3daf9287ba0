// Small helper functions to generate random instances of the flow-shop
// scheduling problem, for CLI demos, benchmarking and property tests.

use crate::model::{Instance, Job};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates a randomized flow-shop instance with `num_jobs` jobs and
/// `num_stages` stages. Each stage gets a machine count drawn uniformly
/// from `[min_machines, max_machines]`; each job's processing time at each
/// stage is drawn uniformly from `[min_processing_time, max_processing_time)`.
/// Search knobs (`max_iterations`, `random_seed`, GA parameters) are passed
/// through unchanged so the generated instance is immediately usable by
/// `optimize`.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn instance(
    num_jobs: usize,
    num_stages: usize,
    min_machines: usize,
    max_machines: usize,
    min_processing_time: f64,
    max_processing_time: f64,
    seed: Option<u64>,
    max_iterations: usize,
    ga_population_size: usize,
    ga_mutation_rate: f64,
    ga_tournament_size: usize,
    ga_elitism_count: usize,
) -> Instance {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    let machines_per_stage = machines_per_stage(num_stages, min_machines, max_machines, &mut rng);
    let jobs = jobs(
        num_jobs,
        num_stages,
        min_processing_time,
        max_processing_time,
        &mut rng,
    );

    Instance {
        num_jobs,
        num_stages,
        machines_per_stage,
        jobs,
        max_iterations,
        random_seed: seed,
        ga_population_size,
        ga_mutation_rate,
        ga_tournament_size,
        ga_elitism_count,
    }
}

fn machines_per_stage(
    num_stages: usize,
    min_machines: usize,
    max_machines: usize,
    rng: &mut StdRng,
) -> Vec<usize> {
    (0..num_stages)
        .map(|_| rng.random_range(min_machines..=max_machines))
        .collect()
}

fn jobs(num_jobs: usize, num_stages: usize, min_p: f64, max_p: f64, rng: &mut StdRng) -> Vec<Job> {
    (0..num_jobs as i64)
        .map(|id| Job {
            id,
            processing_times: (0..num_stages).map(|_| rng.random_range(min_p..max_p)).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_a_valid_instance() {
        let inst = instance(10, 3, 1, 2, 1.0, 10.0, Some(42), 50, 10, 0.2, 3, 1);
        inst.validate().unwrap();
        assert_eq!(inst.jobs.len(), 10);
        assert_eq!(inst.machines_per_stage.len(), 3);
        for job in &inst.jobs {
            assert_eq!(job.processing_times.len(), 3);
            for &p in &job.processing_times {
                assert!((1.0..10.0).contains(&p));
            }
        }
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let a = instance(5, 2, 1, 3, 1.0, 5.0, Some(7), 10, 4, 0.1, 2, 1);
        let b = instance(5, 2, 1, 3, 1.0, 5.0, Some(7), 10, 4, 0.1, 2, 1);
        assert_eq!(a.machines_per_stage, b.machines_per_stage);
        assert_eq!(a.jobs, b.jobs);
    }
}
