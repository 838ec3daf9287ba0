// CSV file handling for the CLI: reading an `Instance` from job/machine
// tables and writing a `ScheduleResult` back out. This is the crate's own
// thin transport, standing in for the out-of-scope HTTP layer.

use crate::model::{Instance, Job, ScheduleError, ScheduleResult};
use csv::{ReaderBuilder, Writer};

/// Search knobs that are not carried by the CSV files themselves, since
/// they are per-run options rather than problem data.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub max_iterations: usize,
    pub random_seed: Option<u64>,
    pub ga_population_size: usize,
    pub ga_mutation_rate: f64,
    pub ga_tournament_size: usize,
    pub ga_elitism_count: usize,
}

/// Reads a job CSV (`id,p_0,p_1,...,p_{num_stages-1}`) and a machines CSV
/// (`stage,machines`) and returns a validated `Instance`.
///
/// # Errors
/// Returns `ScheduleError::Csv`/`ScheduleError::Io` on malformed or
/// unreadable files, or `ScheduleError::InvalidInstance` if the resulting
/// instance fails validation.
pub fn read_instance(
    job_file: &str,
    machines_file: &str,
    config: SearchConfig,
) -> Result<Instance, ScheduleError> {
    let jobs = read_jobs(job_file)?;
    let num_stages = jobs.first().map_or(0, |j: &Job| j.processing_times.len());
    let machines_per_stage = read_machines(machines_file, num_stages)?;

    let instance = Instance {
        num_jobs: jobs.len(),
        num_stages,
        machines_per_stage,
        jobs,
        max_iterations: config.max_iterations,
        random_seed: config.random_seed,
        ga_population_size: config.ga_population_size,
        ga_mutation_rate: config.ga_mutation_rate,
        ga_tournament_size: config.ga_tournament_size,
        ga_elitism_count: config.ga_elitism_count,
    };
    instance.validate()?;
    Ok(instance)
}

fn read_jobs(job_file: &str) -> Result<Vec<Job>, ScheduleError> {
    let mut rdr = ReaderBuilder::new().from_path(job_file)?;
    let headers = rdr.headers()?.clone();
    if headers.len() <= 1 {
        return Err(ScheduleError::InvalidInstance(
            "job file must have an id column plus at least one stage column".into(),
        ));
    }
    if headers.iter().next() != Some("id") {
        return Err(ScheduleError::InvalidInstance(
            "job file's first column must be named id".into(),
        ));
    }

    let mut jobs = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let id: i64 = record.get(0).ok_or_else(|| missing(row, "id"))?.parse().map_err(|_| {
            ScheduleError::InvalidInstance(format!("row {row}: id is not an integer"))
        })?;
        let mut processing_times = Vec::with_capacity(headers.len() - 1);
        for (column, cell) in record.iter().enumerate().skip(1) {
            let value: f64 = cell.parse().map_err(|_| {
                ScheduleError::InvalidInstance(format!(
                    "row {row}, column {column}: processing time is not a number"
                ))
            })?;
            processing_times.push(value);
        }
        jobs.push(Job { id, processing_times });
    }
    Ok(jobs)
}

fn read_machines(machines_file: &str, num_stages: usize) -> Result<Vec<usize>, ScheduleError> {
    let mut rdr = ReaderBuilder::new().from_path(machines_file)?;
    let headers = rdr.headers()?.clone();
    if headers.iter().collect::<Vec<_>>() != vec!["stage", "machines"] {
        return Err(ScheduleError::InvalidInstance(
            "machines file must have columns stage,machines".into(),
        ));
    }

    let mut by_stage = vec![None; num_stages.max(1)];
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let stage: usize = record.get(0).ok_or_else(|| missing(row, "stage"))?.parse().map_err(|_| {
            ScheduleError::InvalidInstance(format!("row {row}: stage is not an integer"))
        })?;
        let machines: usize = record
            .get(1)
            .ok_or_else(|| missing(row, "machines"))?
            .parse()
            .map_err(|_| ScheduleError::InvalidInstance(format!("row {row}: machines is not an integer")))?;
        if stage >= by_stage.len() {
            by_stage.resize(stage + 1, None);
        }
        by_stage[stage] = Some(machines);
    }

    by_stage
        .into_iter()
        .enumerate()
        .map(|(stage, m)| m.ok_or_else(|| {
            ScheduleError::InvalidInstance(format!("machines file is missing stage {stage}"))
        }))
        .collect()
}

fn missing(row: usize, field: &str) -> ScheduleError {
    ScheduleError::InvalidInstance(format!("row {row}: missing {field}"))
}

/// Writes an `Instance`'s jobs out as a job CSV (`id,p_0,...,p_{num_stages-1}`),
/// for the `generate` subcommand.
///
/// # Errors
/// Returns `ScheduleError::Csv`/`ScheduleError::Io` if the file cannot be
/// written.
pub fn write_jobs(path: &str, instance: &Instance) -> Result<(), ScheduleError> {
    let mut wtr = Writer::from_path(path)?;
    let mut header = vec!["id".to_string()];
    header.extend((0..instance.num_stages).map(|s| format!("p_{s}")));
    wtr.write_record(&header)?;
    for job in &instance.jobs {
        let mut row = vec![job.id.to_string()];
        row.extend(job.processing_times.iter().map(f64::to_string));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes an `Instance`'s `machines_per_stage` out as a machines CSV
/// (`stage,machines`), for the `generate` subcommand.
///
/// # Errors
/// Returns `ScheduleError::Csv`/`ScheduleError::Io` if the file cannot be
/// written.
pub fn write_machines(path: &str, instance: &Instance) -> Result<(), ScheduleError> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["stage", "machines"])?;
    for (stage, &machines) in instance.machines_per_stage.iter().enumerate() {
        wtr.write_record([stage.to_string(), machines.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a `ScheduleResult` as a CSV to `path`: one row per `TaskLog` plus
/// a trailing summary row holding the makespan.
///
/// # Errors
/// Returns `ScheduleError::Csv`/`ScheduleError::Io` if the file cannot be
/// written.
pub fn write_result(path: &str, result: &ScheduleResult) -> Result<(), ScheduleError> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record([
        "job_id",
        "stage_id",
        "machine_id",
        "global_machine_id",
        "start_time",
        "end_time",
    ])?;
    for task in &result.schedule {
        wtr.write_record([
            task.job_id.to_string(),
            task.stage_id.to_string(),
            task.machine_id.to_string(),
            task.global_machine_id.to_string(),
            task.start_time.to_string(),
            task.end_time.to_string(),
        ])?;
    }
    wtr.write_record(["makespan", &result.makespan.to_string(), "", "", "", ""])?;
    wtr.flush()?;
    Ok(())
}
