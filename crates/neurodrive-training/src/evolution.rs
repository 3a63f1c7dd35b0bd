//! Evolution engine: builds the next generation from a ranked population.
//!
//! # Algorithm
//!
//! Each call to [`EvolutionEngine::execute`] produces exactly
//! `population_count` chromosomes:
//!
//! 1. **Elitism** - the top `keep_count` chromosomes by fitness are copied
//!    verbatim and never mutated
//! 2. **Immigrants** - under stagnation, `⌊(population_count - keep_count) × 0.2⌋`
//!    fully random chromosomes are injected
//! 3. **Crossover** - the remaining slots are filled with single-point
//!    crossover children of two distinct elites
//! 4. **Mutation** - every non-elite chromosome is mutated with the adaptive
//!    [`MutationParams`] of the current generation
//!
//! # Adaptive Mutation
//!
//! ```text
//! rate(g)     = max(base_rate × 0.25, base_rate / (1 + 0.02 g))
//! strength(g) = max(0.1, 0.5 / (1 + 0.05 g))
//! ```
//!
//! Under stagnation ("hypermutation") the rate is tripled and the strength
//! doubled, both capped at 0.8, and the replacement chance rises from 0.15 to
//! 0.30.
//!
//! The engine keeps only its generation counter and its RNG between calls;
//! whether the population is stagnating is decided by the caller.

use neurodrive_evaluator::fitness::{EvaluateRunStats, RankableChromosome, rank};
use rand::Rng;

use crate::weights;

const MIN_RATE_FACTOR: f32 = 0.25;
const RATE_DECAY: f32 = 0.02;
const INITIAL_STRENGTH: f32 = 0.5;
const MIN_STRENGTH: f32 = 0.1;
const STRENGTH_DECAY: f32 = 0.05;
const HYPERMUTATION_RATE_FACTOR: f32 = 3.0;
const HYPERMUTATION_STRENGTH_FACTOR: f32 = 2.0;
const HYPERMUTATION_CAP: f32 = 0.8;
const REPLACEMENT_CHANCE: f32 = 0.15;
const HYPERMUTATION_REPLACEMENT_CHANCE: f32 = 0.30;
const IMMIGRANT_DIVISOR: usize = 5;

/// Per-gene mutation parameters for one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationParams {
    /// Probability that a gene mutates.
    pub rate: f32,
    /// Standard deviation of the Gaussian perturbation.
    pub strength: f32,
    /// Probability that a mutating gene is replaced instead of perturbed.
    pub replacement_chance: f32,
}

impl MutationParams {
    /// Parameters for generation `generation` with the given base rate.
    ///
    /// ```
    /// use neurodrive_training::evolution::MutationParams;
    ///
    /// let params = MutationParams::for_generation(0.05, 0, false);
    /// assert_eq!(params.rate, 0.05);
    /// assert_eq!(params.strength, 0.5);
    /// ```
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn for_generation(base_rate: f32, generation: usize, stagnated: bool) -> Self {
        let g = generation as f32;
        let rate = f32::max(base_rate * MIN_RATE_FACTOR, base_rate / (1.0 + RATE_DECAY * g));
        let strength = f32::max(MIN_STRENGTH, INITIAL_STRENGTH / (1.0 + STRENGTH_DECAY * g));
        if stagnated {
            Self {
                rate: f32::min(rate * HYPERMUTATION_RATE_FACTOR, HYPERMUTATION_CAP),
                strength: f32::min(strength * HYPERMUTATION_STRENGTH_FACTOR, HYPERMUTATION_CAP),
                replacement_chance: HYPERMUTATION_REPLACEMENT_CHANCE,
            }
        } else {
            Self {
                rate,
                strength,
                replacement_chance: REPLACEMENT_CHANCE,
            }
        }
    }
}

/// Number of random immigrants injected under stagnation.
#[must_use]
pub fn immigrant_count(population_count: usize, keep_count: usize) -> usize {
    population_count.saturating_sub(keep_count) / IMMIGRANT_DIVISOR
}

/// Turns a ranked population into the next generation's chromosomes.
#[derive(Debug, Clone)]
pub struct EvolutionEngine<R> {
    population_count: usize,
    keep_count: usize,
    base_rate: f32,
    generation: usize,
    rng: R,
}

impl<R> EvolutionEngine<R>
where
    R: Rng,
{
    /// Creates an engine at generation 0.
    ///
    /// `keep_count` must be at least 1 and at most `population_count`; the
    /// training configuration enforces this before an engine is built.
    pub fn new(population_count: usize, keep_count: usize, base_rate: f32, rng: R) -> Self {
        Self {
            population_count,
            keep_count,
            base_rate,
            generation: 0,
            rng,
        }
    }

    /// Number of completed [`execute`](Self::execute) calls.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn population_count(&self) -> usize {
        self.population_count
    }

    #[must_use]
    pub fn keep_count(&self) -> usize {
        self.keep_count
    }

    /// Mutation parameters the next call to `execute` will use.
    #[must_use]
    pub fn mutation_params(&self, stagnated: bool) -> MutationParams {
        MutationParams::for_generation(self.base_rate, self.generation, stagnated)
    }

    /// Produces exactly `population_count` chromosomes, elites first.
    ///
    /// # Panics
    ///
    /// Panics if `population` is empty.
    pub fn execute<E>(
        &mut self,
        evaluator: &E,
        population: &[RankableChromosome],
        stagnated: bool,
    ) -> Vec<Vec<f32>>
    where
        E: EvaluateRunStats + ?Sized,
    {
        assert!(!population.is_empty(), "cannot evolve an empty population");

        let params = self.mutation_params(stagnated);
        self.generation += 1;

        let ranked = rank(evaluator, population);
        let elites: Vec<&[f32]> = ranked
            .iter()
            .take(self.keep_count.max(1))
            .map(|r| r.chromosome.chromosome.as_slice())
            .collect();
        let gene_count = elites[0].len();

        let mut next: Vec<Vec<f32>> = Vec::with_capacity(self.population_count);
        next.extend(elites.iter().map(|c| c.to_vec()));
        let elite_count = next.len();

        if stagnated {
            let immigrants = immigrant_count(self.population_count, self.keep_count);
            for _ in 0..immigrants {
                if next.len() >= self.population_count {
                    break;
                }
                next.push(weights::random(&mut self.rng, gene_count));
            }
        }

        while next.len() < self.population_count {
            let (i, j) = self.pick_parents(elites.len());
            next.push(weights::single_point_crossover(
                elites[i],
                elites[j],
                &mut self.rng,
            ));
        }
        next.truncate(self.population_count);

        for child in next.iter_mut().skip(elite_count) {
            weights::mutate(child, params, &mut self.rng);
        }

        tracing::debug!(
            generation = self.generation,
            stagnated,
            rate = params.rate,
            strength = params.strength,
            "evolved next generation"
        );
        next
    }

    /// Picks two parent indices, distinct whenever more than one elite exists.
    fn pick_parents(&mut self, elite_count: usize) -> (usize, usize) {
        let first = self.rng.random_range(0..elite_count);
        if elite_count < 2 {
            return (first, first);
        }
        let mut second = self.rng.random_range(0..elite_count - 1);
        if second >= first {
            second += 1;
        }
        (first, second)
    }
}
