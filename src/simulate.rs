//! The deterministic flow-shop simulator: the single source of truth for
//! mapping a permutation to a complete schedule and its makespan.

use crate::model::{Instance, ScheduleError, ScheduleResult, TaskLog};
use std::collections::HashMap;

/// Per-job progress through the shop.
struct JobState {
    job_id: i64,
    /// Index into the permutation; used as the tie-break priority.
    priority: usize,
    current_stage: usize,
    ready_time: f64,
    done: bool,
}

/// Simulates `permutation` against `instance` and returns the resulting
/// schedule and makespan.
///
/// This is a pure function: identical inputs always produce an identical
/// `ScheduleResult`. See `SPEC_FULL.md` §4.1 for the full contract.
///
/// # Errors
/// Returns `ScheduleError::InvalidInstance` if `instance` violates its own
/// invariants, or `ScheduleError::InvalidPermutation` if `permutation` is
/// not a bijection onto `instance`'s job ids.
pub fn simulate(instance: &Instance, permutation: &[i64]) -> Result<ScheduleResult, ScheduleError> {
    instance.validate()?;
    instance.validate_permutation(permutation)?;

    log::debug!(
        "simulating {} jobs over {} stages",
        instance.num_jobs,
        instance.num_stages
    );

    let jobs_by_id: HashMap<i64, &crate::model::Job> =
        instance.jobs.iter().map(|j| (j.id, j)).collect();

    let mut states: Vec<JobState> = permutation
        .iter()
        .enumerate()
        .map(|(priority, &job_id)| JobState {
            job_id,
            priority,
            current_stage: 0,
            ready_time: 0.0,
            done: false,
        })
        .collect();

    // avail[stage][machine] = time that machine next becomes free.
    let mut avail: Vec<Vec<f64>> = instance
        .machines_per_stage
        .iter()
        .map(|&m| vec![0.0_f64; m])
        .collect();

    let mut schedule = Vec::with_capacity(instance.num_jobs * instance.num_stages);
    let remaining = instance.num_jobs * instance.num_stages;

    for _ in 0..remaining {
        // Pick the job with the smallest (ready_time, priority) among the
        // not-yet-complete jobs.
        let next = states
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.done)
            .min_by(|(_, a), (_, b)| {
                a.ready_time
                    .partial_cmp(&b.ready_time)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.priority.cmp(&b.priority))
            })
            .map(|(idx, _)| idx)
            .ok_or_else(|| {
                ScheduleError::InvalidPermutation("no ready job found but schedule incomplete".into())
            })?;

        let stage = states[next].current_stage;
        let job_id = states[next].job_id;
        let job = jobs_by_id.get(&job_id).ok_or_else(|| {
            ScheduleError::InvalidPermutation(format!("job id {job_id} not found in instance"))
        })?;
        let processing_time = job.processing_times[stage];
        let ready_time = states[next].ready_time;

        let machines = &mut avail[stage];
        let (machine_id, start_time) = select_machine(machines, ready_time);
        let end_time = start_time + processing_time;
        machines[machine_id] = end_time;

        let global_machine_id: usize =
            instance.machines_per_stage[..stage].iter().sum::<usize>() + machine_id;

        schedule.push(TaskLog {
            job_id,
            stage_id: stage,
            machine_id,
            global_machine_id,
            start_time,
            end_time,
        });

        if stage + 1 == instance.num_stages {
            states[next].done = true;
        } else {
            states[next].current_stage = stage + 1;
            states[next].ready_time = end_time;
        }
    }

    let makespan = schedule
        .iter()
        .map(|t| t.end_time)
        .fold(0.0_f64, f64::max);

    Ok(ScheduleResult {
        makespan,
        schedule,
        permutation: permutation.to_vec(),
    })
}

/// Applies the machine-selection policy of `SPEC_FULL.md` §4.1: the
/// lowest-index machine that is already free by `ready_time`, or, failing
/// that, the machine that frees up soonest (lowest index breaks ties).
fn select_machine(avail: &[f64], ready_time: f64) -> (usize, f64) {
    if let Some(machine_id) = avail.iter().position(|&a| a <= ready_time) {
        return (machine_id, ready_time);
    }
    let (machine_id, &free_at) = avail
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .expect("avail is non-empty: machines_per_stage[stage] >= 1");
    (machine_id, free_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Job;
    use rstest::rstest;

    fn instance(num_stages: usize, machines_per_stage: Vec<usize>, jobs: Vec<Job>) -> Instance {
        Instance {
            num_jobs: jobs.len(),
            num_stages,
            machines_per_stage,
            jobs,
            max_iterations: 10,
            random_seed: Some(1),
            ga_population_size: 4,
            ga_mutation_rate: 0.2,
            ga_tournament_size: 2,
            ga_elitism_count: 1,
        }
    }

    fn job(id: i64, processing_times: &[f64]) -> Job {
        Job {
            id,
            processing_times: processing_times.to_vec(),
        }
    }

    #[test]
    fn s1_single_stage_single_machine() {
        let inst = instance(
            1,
            vec![1],
            vec![job(0, &[3.0]), job(1, &[2.0]), job(2, &[5.0])],
        );
        let result = simulate(&inst, &[1, 0, 2]).unwrap();
        assert_eq!(result.makespan, 10.0);
        assert_eq!(result.schedule.len(), 3);
        let by_job: HashMap<i64, &TaskLog> =
            result.schedule.iter().map(|t| (t.job_id, t)).collect();
        assert_eq!(by_job[&1].start_time, 0.0);
        assert_eq!(by_job[&1].end_time, 2.0);
        assert_eq!(by_job[&0].start_time, 2.0);
        assert_eq!(by_job[&0].end_time, 5.0);
        assert_eq!(by_job[&2].start_time, 5.0);
        assert_eq!(by_job[&2].end_time, 10.0);
    }

    #[test]
    fn s1_any_permutation_same_makespan() {
        let inst = instance(
            1,
            vec![1],
            vec![job(0, &[3.0]), job(1, &[2.0]), job(2, &[5.0])],
        );
        for perm in [
            [0i64, 1, 2],
            [1, 0, 2],
            [2, 1, 0],
            [2, 0, 1],
            [0, 2, 1],
            [1, 2, 0],
        ] {
            let result = simulate(&inst, &perm).unwrap();
            assert_eq!(result.makespan, 10.0);
        }
    }

    #[test]
    fn s2_two_stages_permutation_changes_makespan() {
        let inst = instance(2, vec![1, 1], vec![job(0, &[4.0, 1.0]), job(1, &[1.0, 4.0])]);
        let ab = simulate(&inst, &[0, 1]).unwrap();
        assert_eq!(ab.makespan, 9.0);
        let ba = simulate(&inst, &[1, 0]).unwrap();
        assert_eq!(ba.makespan, 6.0);
    }

    #[test]
    fn s3_parallel_machines_in_stage() {
        let inst = instance(
            1,
            vec![2],
            vec![job(0, &[5.0]), job(1, &[5.0]), job(2, &[5.0])],
        );
        let result = simulate(&inst, &[0, 1, 2]).unwrap();
        assert_eq!(result.makespan, 10.0);
        let third = result
            .schedule
            .iter()
            .find(|t| t.job_id == 2)
            .expect("job 2 scheduled");
        assert_eq!(third.machine_id, 0);
        assert_eq!(third.start_time, 5.0);
    }

    #[test]
    fn invariant_task_log_count() {
        let inst = instance(
            2,
            vec![1, 2],
            vec![job(0, &[4.0, 1.0]), job(1, &[1.0, 4.0]), job(2, &[2.0, 2.0])],
        );
        let result = simulate(&inst, &[0, 1, 2]).unwrap();
        assert_eq!(result.schedule.len(), 3 * 2);
    }

    #[test]
    fn invariant_no_machine_overlap() {
        let inst = instance(
            1,
            vec![2],
            vec![job(0, &[5.0]), job(1, &[5.0]), job(2, &[5.0])],
        );
        let result = simulate(&inst, &[0, 1, 2]).unwrap();
        for stage in 0..inst.num_stages {
            for machine in 0..inst.machines_per_stage[stage] {
                let mut intervals: Vec<(f64, f64)> = result
                    .schedule
                    .iter()
                    .filter(|t| t.stage_id == stage && t.machine_id == machine)
                    .map(|t| (t.start_time, t.end_time))
                    .collect();
                intervals.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
                for w in intervals.windows(2) {
                    assert!(w[0].1 <= w[1].0, "overlap on stage {stage} machine {machine}");
                }
            }
        }
    }

    #[test]
    fn invariant_per_job_chain_ordering() {
        let inst = instance(
            3,
            vec![1, 1, 1],
            vec![job(0, &[4.0, 1.0, 2.0]), job(1, &[1.0, 4.0, 1.0])],
        );
        let result = simulate(&inst, &[0, 1]).unwrap();
        for job_id in [0i64, 1] {
            let mut logs: Vec<&TaskLog> = result
                .schedule
                .iter()
                .filter(|t| t.job_id == job_id)
                .collect();
            logs.sort_by_key(|t| t.stage_id);
            for w in logs.windows(2) {
                assert!(w[0].end_time <= w[1].start_time);
            }
        }
    }

    #[test]
    fn determinism() {
        let inst = instance(
            2,
            vec![2, 1],
            vec![job(0, &[4.0, 1.0]), job(1, &[1.0, 4.0]), job(2, &[2.0, 2.0])],
        );
        let a = simulate(&inst, &[2, 0, 1]).unwrap();
        let b = simulate(&inst, &[2, 0, 1]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_invalid_permutation() {
        let inst = instance(1, vec![1], vec![job(0, &[1.0]), job(1, &[1.0])]);
        let err = simulate(&inst, &[0, 0]).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidPermutation(_)));
    }

    #[test]
    fn rejects_invalid_instance() {
        let mut inst = instance(1, vec![1], vec![job(0, &[1.0])]);
        inst.num_stages = 2; // now machines_per_stage length mismatches
        let err = simulate(&inst, &[0]).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidInstance(_)));
    }

    #[test]
    fn invariant_capacity_lower_bound() {
        let inst = instance(
            2,
            vec![2, 1],
            vec![job(0, &[4.0, 1.0]), job(1, &[1.0, 4.0]), job(2, &[2.0, 2.0])],
        );
        let result = simulate(&inst, &[0, 1, 2]).unwrap();
        let lower_bound: f64 = (0..inst.num_stages)
            .map(|stage| {
                let min_p = inst.jobs.iter().map(|j| j.processing_times[stage]).fold(f64::INFINITY, f64::min);
                min_p / inst.machines_per_stage[stage] as f64
            })
            .sum();
        assert!(result.makespan >= lower_bound);
    }

    #[rstest]
    #[case::s2_ab(vec![0, 1], 9.0)]
    #[case::s2_ba(vec![1, 0], 6.0)]
    fn s2_permutation_changes_makespan(#[case] permutation: Vec<i64>, #[case] expected: f64) {
        let inst = instance(2, vec![1, 1], vec![job(0, &[4.0, 1.0]), job(1, &[1.0, 4.0])]);
        let result = simulate(&inst, &permutation).unwrap();
        assert_eq!(result.makespan, expected);
    }

    #[rstest]
    #[case::all_first_machine(vec![0, 1, 2], 0)]
    #[case::reordered(vec![1, 0, 2], 0)]
    fn s3_third_job_waits_for_lowest_index_free_machine(
        #[case] permutation: Vec<i64>,
        #[case] expected_machine: usize,
    ) {
        let inst = instance(
            1,
            vec![2],
            vec![job(0, &[5.0]), job(1, &[5.0]), job(2, &[5.0])],
        );
        let result = simulate(&inst, &permutation).unwrap();
        let last = permutation[2];
        let log = result
            .schedule
            .iter()
            .find(|t| t.job_id == last)
            .expect("last job scheduled");
        assert_eq!(log.machine_id, expected_machine);
        assert_eq!(log.start_time, 5.0);
    }
}
