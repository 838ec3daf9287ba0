//! Bayesian permutation optimizer: argsort-decodes a continuous vector in
//! `[0,1]^num_jobs` into a permutation and optimizes a distance-weighted
//! Gaussian-process-style surrogate over it with expected-improvement
//! acquisition. See `SPEC_FULL.md` §4.4.

use crate::model::{Instance, ScheduleError, ScheduleResult};
use crate::simulate::simulate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Candidates scored by expected improvement on each non-space-filling
/// iteration.
const CANDIDATE_POOL_SIZE: usize = 25;
/// RBF kernel length-scale used by the surrogate's distance weighting.
const LENGTH_SCALE: f64 = 0.5;

/// Decodes `x` into a permutation of job ids: pair each job id with its
/// coordinate, stable-sort ascending by coordinate, break ties by
/// ascending job id.
#[must_use]
pub fn decode(instance: &Instance, x: &[f64]) -> Vec<i64> {
    let mut paired: Vec<(i64, f64)> = instance
        .jobs
        .iter()
        .map(|j| j.id)
        .zip(x.iter().copied())
        .collect();
    paired.sort_by(|(id_a, x_a), (id_b, x_b)| {
        x_a.partial_cmp(x_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(id_a.cmp(id_b))
    });
    paired.into_iter().map(|(id, _)| id).collect()
}

/// Runs the GP-EI search described in `SPEC_FULL.md` §4.4 for
/// `instance.max_iterations` total objective evaluations and returns the
/// best `ScheduleResult` found.
///
/// # Errors
/// Propagates `ScheduleError::InvalidInstance`, and any error from
/// `simulate` on an internally generated permutation (which should not
/// occur on a validated instance).
pub fn bayesian_search(instance: &Instance) -> Result<ScheduleResult, ScheduleError> {
    instance.validate()?;

    if instance.max_iterations == 0 {
        return Err(ScheduleError::SearchAborted(
            "bayesian search requires max_iterations >= 1".into(),
        ));
    }

    let mut rng = match instance.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let n = instance.num_jobs;
    let initial_samples = instance.max_iterations.min(n.max(2));

    let mut observed_x: Vec<Vec<f64>> = Vec::with_capacity(instance.max_iterations);
    let mut observed_f: Vec<f64> = Vec::with_capacity(instance.max_iterations);
    let mut best_x: Vec<f64> = vec![0.0; n];
    let mut best_f = f64::INFINITY;

    let normal = Normal::new(0.0, 1.0).expect("standard normal is always valid");

    for iteration in 0..instance.max_iterations {
        let x = if iteration < initial_samples {
            jittered_sample(n, iteration, initial_samples, &mut rng)
        } else {
            let mut best_candidate = random_point(n, &mut rng);
            let mut best_ei = f64::NEG_INFINITY;
            for _ in 0..CANDIDATE_POOL_SIZE {
                let candidate = random_point(n, &mut rng);
                let (mu, sigma) = surrogate_posterior(&observed_x, &observed_f, &candidate);
                let ei = expected_improvement(best_f, mu, sigma, &normal);
                if ei > best_ei {
                    best_ei = ei;
                    best_candidate = candidate;
                }
            }
            best_candidate
        };

        let permutation = decode(instance, &x);
        let result = simulate(instance, &permutation)?;

        observed_x.push(x.clone());
        observed_f.push(result.makespan);

        if result.makespan < best_f {
            best_f = result.makespan;
            best_x = x;
        }

        log::debug!("bayesian iteration {iteration}: best makespan so far {best_f}");
    }

    simulate(instance, &decode(instance, &best_x))
}

/// Draws a uniformly random point in `[0,1]^n`.
fn random_point(n: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..n).map(|_| rng.random_range(0.0..1.0)).collect()
}

/// Space-filling initial sample: stratifies coordinate `0` into
/// `initial_samples` bins (Latin-hypercube-like jitter) and draws the rest
/// uniformly, so early surrogate fits see some spread rather than pure
/// clustering.
fn jittered_sample(n: usize, index: usize, initial_samples: usize, rng: &mut StdRng) -> Vec<f64> {
    let bin_width = 1.0 / initial_samples as f64;
    let stratified = bin_width * (index as f64 + rng.random_range(0.0..1.0));
    let mut x = vec![stratified];
    x.extend((1..n).map(|_| rng.random_range(0.0..1.0)));
    x
}

/// Distance-weighted (RBF kernel) estimate of the objective's posterior
/// mean and standard deviation at `x`, given the points observed so far.
/// With no observations, returns a wide, uninformative prior.
fn surrogate_posterior(observed_x: &[Vec<f64>], observed_f: &[f64], x: &[f64]) -> (f64, f64) {
    if observed_x.is_empty() {
        return (0.0, 1.0);
    }

    let weights: Vec<f64> = observed_x
        .iter()
        .map(|obs| {
            let sq_dist: f64 = obs.iter().zip(x).map(|(a, b)| (a - b).powi(2)).sum();
            (-sq_dist / (2.0 * LENGTH_SCALE * LENGTH_SCALE)).exp()
        })
        .collect();

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum < 1e-12 {
        // x is far (in kernel terms) from every observation: fall back to
        // the empirical mean with maximal uncertainty.
        let mean = observed_f.iter().sum::<f64>() / observed_f.len() as f64;
        return (mean, 1.0);
    }

    let mu: f64 = weights
        .iter()
        .zip(observed_f)
        .map(|(w, f)| w * f)
        .sum::<f64>()
        / weight_sum;

    // Closest observation's weight drives confidence: weight near 1 (x is
    // on top of an observation) collapses sigma toward 0; weight near 0
    // (x is far from everything observed) leaves sigma near its max.
    let max_weight = weights.iter().copied().fold(0.0_f64, f64::max);
    let spread = (observed_f.iter().map(|f| (f - mu).powi(2)).sum::<f64>() / observed_f.len() as f64)
        .sqrt()
        .max(1e-6);
    let sigma = spread * (1.0 - max_weight) + 1e-9;

    (mu, sigma)
}

/// Closed-form expected improvement for a minimization objective:
/// `EI(x) = (best - mu) * Phi(z) + sigma * phi(z)`, clamped to `0` when
/// `sigma` is numerically zero.
fn expected_improvement(best_f: f64, mu: f64, sigma: f64, normal: &Normal) -> f64 {
    if sigma < 1e-9 {
        return 0.0;
    }
    let improvement = best_f - mu;
    let z = improvement / sigma;
    improvement * normal.cdf(z) + sigma * normal.pdf(z)
}
