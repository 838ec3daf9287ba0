//! Pure heuristic orderings: each maps an `Instance` to a permutation of
//! job ids by sorting on a fixed key, with all ties broken by ascending
//! job id. See `SPEC_FULL.md` §4.2.

use crate::model::{Instance, Job, ScheduleError};

/// Total processing time, ascending (shortest processing time first).
pub fn spt(instance: &Instance) -> Result<Vec<i64>, ScheduleError> {
    instance.validate()?;
    Ok(sorted_by_key(instance, Job::total_processing_time))
}

/// Total processing time, descending (longest processing time first).
pub fn lpt(instance: &Instance) -> Result<Vec<i64>, ScheduleError> {
    instance.validate()?;
    let mut jobs: Vec<&Job> = instance.jobs.iter().collect();
    jobs.sort_by(|a, b| {
        b.total_processing_time()
            .partial_cmp(&a.total_processing_time())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    Ok(jobs.into_iter().map(|j| j.id).collect())
}

/// Processing time at stage 0, ascending.
pub fn first_stage_spt(instance: &Instance) -> Result<Vec<i64>, ScheduleError> {
    instance.validate()?;
    Ok(sorted_by_key(instance, |j| j.processing_times[0]))
}

/// Processing time at the last stage, ascending.
pub fn last_stage_spt(instance: &Instance) -> Result<Vec<i64>, ScheduleError> {
    instance.validate()?;
    Ok(sorted_by_key(instance, |j| {
        j.processing_times[instance.num_stages - 1]
    }))
}

/// Processing time at the bottleneck stage (the stage with the fewest
/// machines, lowest index on ties), ascending.
pub fn bottleneck(instance: &Instance) -> Result<Vec<i64>, ScheduleError> {
    instance.validate()?;
    let bottleneck_stage = instance
        .machines_per_stage
        .iter()
        .enumerate()
        .min_by_key(|&(_, &count)| count)
        .map(|(stage, _)| stage)
        .expect("num_stages >= 1, checked by validate");
    Ok(sorted_by_key(instance, |j| {
        j.processing_times[bottleneck_stage]
    }))
}

/// Stable-sorts jobs ascending by `key`, breaking ties by ascending job id,
/// and returns their ids.
fn sorted_by_key(instance: &Instance, key: impl Fn(&Job) -> f64) -> Vec<i64> {
    let mut jobs: Vec<&Job> = instance.jobs.iter().collect();
    jobs.sort_by(|a, b| {
        key(a)
            .partial_cmp(&key(b))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    jobs.into_iter().map(|j| j.id).collect()
}
