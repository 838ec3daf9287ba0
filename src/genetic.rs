//! Genetic algorithm over permutations: ordered crossover (OX1), shuffle
//! mutation, tournament selection and elitism. See `SPEC_FULL.md` §4.5.

use crate::model::{Instance, ScheduleError, ScheduleResult};
use crate::simulate::simulate;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const CROSSOVER_RATE: f64 = 0.9;
const MUTATION_SWAP_RATE: f64 = 0.05;

/// One individual: a permutation of job ids plus its cached fitness.
#[derive(Clone)]
struct Individual {
    permutation: Vec<i64>,
    fitness: f64,
}

/// Runs `instance.max_iterations` generations of the GA described in
/// `SPEC_FULL.md` §4.5 and returns the best individual found, evaluated one
/// final time.
///
/// # Errors
/// Propagates `ScheduleError::InvalidInstance`, and any error from
/// `simulate` on an internally generated permutation (which should not
/// occur on a validated instance).
pub fn genetic_search(instance: &Instance) -> Result<ScheduleResult, ScheduleError> {
    instance.validate()?;

    let mut rng = match instance.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    if instance.max_iterations == 0 {
        return Err(ScheduleError::SearchAborted(
            "genetic algorithm requires max_iterations >= 1".into(),
        ));
    }

    let mut population = initial_population(instance, &mut rng)?;

    for generation in 0..instance.max_iterations {
        let elites = select_elites(&population, instance.ga_elitism_count);

        let offspring_count = instance.ga_population_size - instance.ga_elitism_count;
        let mut parents = Vec::with_capacity(offspring_count);
        for _ in 0..offspring_count {
            parents.push(tournament_select(&population, instance.ga_tournament_size, &mut rng).clone());
        }

        // (permutation, fitness if still valid, i.e. unchanged from its parent)
        let mut offspring: Vec<(Vec<i64>, Option<f64>)> = Vec::with_capacity(offspring_count);
        let mut adjacent_pairs = parents.into_iter().tuples::<(_, _)>();
        for (p1, p2) in &mut adjacent_pairs {
            if rng.random::<f64>() < CROSSOVER_RATE {
                let (c1, c2) = ordered_crossover(&p1.permutation, &p2.permutation, &mut rng);
                offspring.push((c1, None));
                offspring.push((c2, None));
            } else {
                offspring.push((p1.permutation, Some(p1.fitness)));
                offspring.push((p2.permutation, Some(p2.fitness)));
            }
        }
        for leftover in adjacent_pairs.into_buffer() {
            offspring.push((leftover.permutation, Some(leftover.fitness)));
        }

        let offspring: Vec<(Vec<i64>, Option<f64>)> = offspring
            .into_iter()
            .map(|(perm, fitness)| {
                if rng.random::<f64>() < instance.ga_mutation_rate {
                    (shuffle_mutate(perm, &mut rng), None)
                } else {
                    (perm, fitness)
                }
            })
            .collect();

        let mut next_population = elites;
        for (permutation, fitness) in offspring {
            let fitness = match fitness {
                Some(f) => f,
                None => simulate(instance, &permutation)?.makespan,
            };
            next_population.push(Individual { permutation, fitness });
        }
        population = next_population;

        debug_assert_eq!(population.len(), instance.ga_population_size);
        log::debug!(
            "generation {generation}: best fitness {}",
            population
                .iter()
                .map(|ind| ind.fitness)
                .fold(f64::INFINITY, f64::min)
        );
    }

    let best = population
        .iter()
        .min_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal))
        .expect("population is never empty");

    simulate(instance, &best.permutation)
}

fn initial_population(instance: &Instance, rng: &mut StdRng) -> Result<Vec<Individual>, ScheduleError> {
    let mut population = Vec::with_capacity(instance.ga_population_size);
    let base = instance.identity_permutation();
    for _ in 0..instance.ga_population_size {
        let mut permutation = base.clone();
        permutation.shuffle(rng);
        let fitness = simulate(instance, &permutation)?.makespan;
        population.push(Individual { permutation, fitness });
    }
    Ok(population)
}

/// Returns the `count` individuals with smallest fitness, stable (ties by
/// first-seen / original population order).
fn select_elites(population: &[Individual], count: usize) -> Vec<Individual> {
    let mut indexed: Vec<(usize, &Individual)> = population.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        a.fitness
            .partial_cmp(&b.fitness)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ia.cmp(ib))
    });
    indexed
        .into_iter()
        .take(count)
        .map(|(_, ind)| ind.clone())
        .collect()
}

/// Samples `tournament_size` individuals without replacement and returns a
/// reference to the fittest one (ties by first-seen).
fn tournament_select<'a>(
    population: &'a [Individual],
    tournament_size: usize,
    rng: &mut StdRng,
) -> &'a Individual {
    let mut indices: Vec<usize> = (0..population.len()).collect();
    indices.shuffle(rng);
    indices
        .into_iter()
        .take(tournament_size)
        .map(|i| (i, &population[i]))
        .min_by(|(ia, a), (ib, b)| {
            a.fitness
                .partial_cmp(&b.fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        })
        .map(|(_, ind)| ind)
        .expect("tournament_size >= 1, checked by Instance::validate")
}

/// Ordered crossover (OX1): each child inherits a slice from one parent
/// verbatim and fills the rest with the other parent's ids in their
/// relative order, skipping ids already placed.
fn ordered_crossover(parent1: &[i64], parent2: &[i64], rng: &mut StdRng) -> (Vec<i64>, Vec<i64>) {
    let n = parent1.len();
    let mut cut_a = rng.random_range(0..n);
    let mut cut_b = rng.random_range(0..n);
    if cut_a > cut_b {
        std::mem::swap(&mut cut_a, &mut cut_b);
    }
    (
        ox1_child(parent1, parent2, cut_a, cut_b),
        ox1_child(parent2, parent1, cut_a, cut_b),
    )
}

fn ox1_child(donor: &[i64], filler: &[i64], cut_a: usize, cut_b: usize) -> Vec<i64> {
    let n = donor.len();
    let mut child: Vec<Option<i64>> = vec![None; n];
    let mut taken = std::collections::HashSet::with_capacity(n);
    for i in cut_a..=cut_b {
        child[i] = Some(donor[i]);
        taken.insert(donor[i]);
    }
    let mut fill_iter = filler.iter().filter(|id| !taken.contains(id));
    for slot in child.iter_mut() {
        if slot.is_none() {
            *slot = fill_iter.next().copied();
        }
    }
    child.into_iter().map(|id| id.expect("OX1 fills every slot")).collect()
}

/// Shuffle-indexes mutation: visits every position, swapping it with a
/// uniformly chosen other position with independent probability
/// `MUTATION_SWAP_RATE`.
fn shuffle_mutate(mut permutation: Vec<i64>, rng: &mut StdRng) -> Vec<i64> {
    let n = permutation.len();
    for i in 0..n {
        if rng.random::<f64>() < MUTATION_SWAP_RATE {
            let j = rng.random_range(0..n);
            permutation.swap(i, j);
        }
    }
    permutation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Job;

    fn instance(max_iterations: usize, seed: Option<u64>) -> Instance {
        Instance {
            num_jobs: 5,
            num_stages: 2,
            machines_per_stage: vec![1, 2],
            jobs: vec![
                Job { id: 0, processing_times: vec![4.0, 1.0] },
                Job { id: 1, processing_times: vec![1.0, 4.0] },
                Job { id: 2, processing_times: vec![2.0, 2.0] },
                Job { id: 3, processing_times: vec![3.0, 3.0] },
                Job { id: 4, processing_times: vec![2.5, 1.5] },
            ],
            max_iterations,
            random_seed: seed,
            ga_population_size: 6,
            ga_mutation_rate: 0.2,
            ga_tournament_size: 3,
            ga_elitism_count: 2,
        }
    }

    #[test]
    fn s5_reproducible_for_fixed_seed() {
        let inst = instance(15, Some(99));
        let a = genetic_search(&inst).unwrap();
        let b = genetic_search(&inst).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn result_is_a_bijection() {
        let inst = instance(10, Some(3));
        let result = genetic_search(&inst).unwrap();
        inst.validate_permutation(&result.permutation).unwrap();
    }

    #[test]
    fn zero_iterations_is_aborted() {
        let inst = instance(0, Some(1));
        let err = genetic_search(&inst).unwrap_err();
        assert!(matches!(err, ScheduleError::SearchAborted(_)));
    }

    #[test]
    fn best_so_far_is_monotonic_in_generation_count() {
        let inst = instance(1, Some(17));
        let mut previous_best = genetic_search(&inst).unwrap().makespan;
        for max_iterations in [2, 4, 8, 16] {
            let mut longer = inst.clone();
            longer.max_iterations = max_iterations;
            let best = genetic_search(&longer).unwrap().makespan;
            assert!(best <= previous_best);
            previous_best = best;
        }
    }

    #[test]
    fn ox1_child_is_a_permutation() {
        let parent1 = vec![0i64, 1, 2, 3, 4];
        let parent2 = vec![4i64, 3, 2, 1, 0];
        let mut rng = StdRng::seed_from_u64(5);
        let (c1, c2) = ordered_crossover(&parent1, &parent2, &mut rng);
        let mut sorted1 = c1.clone();
        sorted1.sort_unstable();
        assert_eq!(sorted1, vec![0, 1, 2, 3, 4]);
        let mut sorted2 = c2.clone();
        sorted2.sort_unstable();
        assert_eq!(sorted2, vec![0, 1, 2, 3, 4]);
    }
}
