//! Seeded uniform random search over permutations. See `SPEC_FULL.md` §4.3.

use crate::model::{Instance, ScheduleError, ScheduleResult};
use crate::simulate::simulate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Samples `instance.max_iterations` uniformly random permutations (seeded
/// by `instance.random_seed`) and returns the best-scoring `ScheduleResult`.
///
/// # Errors
/// Propagates `ScheduleError::InvalidInstance` from `Instance::validate`.
pub fn random_search(instance: &Instance) -> Result<ScheduleResult, ScheduleError> {
    instance.validate()?;

    let mut rng = match instance.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut permutation = instance.identity_permutation();
    let mut best: Option<ScheduleResult> = None;

    for iteration in 0..instance.max_iterations {
        permutation.shuffle(&mut rng);
        let result = simulate(instance, &permutation)?;
        if best
            .as_ref()
            .is_none_or(|b| result.makespan < b.makespan)
        {
            log::debug!(
                "random search iteration {iteration}: new best makespan {}",
                result.makespan
            );
            best = Some(result);
        }
    }

    match best {
        Some(result) => Ok(result),
        None => {
            log::warn!("random search ran zero iterations, falling back to identity permutation");
            simulate(instance, &instance.identity_permutation())
        }
    }
}
