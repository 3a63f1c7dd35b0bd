//! Run evaluation: fitness of a finished vehicle run.
//!
//! Fitness is a pure function of the terminal [`RunStats`] of a run. Higher is
//! better.
//!
//! # Formula
//!
//! ```text
//! fitness = distance_covered       × w_distance
//!         + reward(checkpoints)
//!         + survival_time          × w_survival
//!         - wall_proximity_penalty × w_wall_proximity
//!         + average_speed          × w_average_speed
//!
//! reward(n) = Σ_{i=1..n} floor(100 × 1.5^(i-1))
//! ```
//!
//! The checkpoint reward grows geometrically: checkpoint 1 is worth 100, and
//! every further checkpoint is worth 1.5× the previous one, so deep progress
//! dominates early progress.
//!
//! The default weights are `1`, `5`, `10` and `0`; the average-speed term is
//! disabled unless configured.
//!
//! # Ranking
//!
//! [`rank`] orders a population by descending fitness. The sort is stable, so
//! ties keep their population order. Both elitism and progress reporting use
//! [`rank`], which keeps them from ever disagreeing about the best chromosome.

use std::fmt;

use neurodrive_engine::RunStats;
use serde::{Deserialize, Serialize};

const FIRST_CHECKPOINT_REWARD: f64 = 100.0;
const CHECKPOINT_REWARD_GROWTH: f64 = 1.5;

/// Cumulative reward for having passed `checkpoints` checkpoints in order.
///
/// ```
/// use neurodrive_evaluator::fitness::checkpoint_reward;
///
/// assert_eq!(checkpoint_reward(0), 0.0);
/// assert_eq!(checkpoint_reward(1), 100.0);
/// assert_eq!(checkpoint_reward(3), 100.0 + 150.0 + 225.0);
/// ```
#[must_use]
#[expect(clippy::cast_possible_truncation)]
pub fn checkpoint_reward(checkpoints: usize) -> f32 {
    let mut total = 0.0;
    let mut increment = FIRST_CHECKPOINT_REWARD;
    for _ in 0..checkpoints {
        total += increment.floor();
        increment *= CHECKPOINT_REWARD_GROWTH;
    }
    total as f32
}

/// Computes a fitness score from terminal run statistics.
pub trait EvaluateRunStats: fmt::Debug + Send + Sync {
    /// Higher is better.
    fn evaluate_run_stats(&self, stats: &RunStats) -> f32;
}

/// Weights of the composite fitness formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub distance: f32,
    pub survival: f32,
    pub wall_proximity: f32,
    pub average_speed: f32,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            survival: 5.0,
            wall_proximity: 10.0,
            average_speed: 0.0,
        }
    }
}

impl FitnessWeights {
    /// Name of the first weight that is not a finite number.
    #[must_use]
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("distance", self.distance),
            ("survival", self.survival),
            ("wall_proximity", self.wall_proximity),
            ("average_speed", self.average_speed),
        ]
        .into_iter()
        .find_map(|(name, value)| (!value.is_finite()).then_some(name))
    }
}

impl EvaluateRunStats for FitnessWeights {
    fn evaluate_run_stats(&self, stats: &RunStats) -> f32 {
        let mut fitness = stats.distance_covered * self.distance
            + checkpoint_reward(stats.last_checkpoint_passed)
            + stats.survival_time * self.survival
            - stats.wall_proximity_penalty * self.wall_proximity;
        if self.average_speed != 0.0 {
            fitness += stats.average_speed() * self.average_speed;
        }
        fitness
    }
}

/// A chromosome together with the statistics of the run it produced.
///
/// This is the unit the evolution engine works on; it carries no reference to
/// the live simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankableChromosome {
    pub chromosome: Vec<f32>,
    pub dimensions: Vec<usize>,
    pub stats: RunStats,
}

/// A population member together with its fitness.
#[derive(Debug, Clone, Copy)]
pub struct Ranked<'a> {
    /// Position in the population that was ranked.
    pub index: usize,
    pub fitness: f32,
    pub chromosome: &'a RankableChromosome,
}

/// Ranks a population by descending fitness.
///
/// Ties keep their original order.
pub fn rank<'a, E>(evaluator: &E, population: &'a [RankableChromosome]) -> Vec<Ranked<'a>>
where
    E: EvaluateRunStats + ?Sized,
{
    let mut ranked: Vec<_> = population
        .iter()
        .enumerate()
        .map(|(index, chromosome)| Ranked {
            index,
            fitness: evaluator.evaluate_run_stats(&chromosome.stats),
            chromosome,
        })
        .collect();
    ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> RunStats {
        RunStats {
            last_checkpoint_passed: 2,
            distance_covered: 120.0,
            survival_time: 3.0,
            wall_proximity_penalty: 0.5,
            smallest_edge_distance: 40.0,
        }
    }

    fn rankable(distance: f32) -> RankableChromosome {
        RankableChromosome {
            chromosome: vec![distance],
            dimensions: vec![1, 1],
            stats: RunStats {
                distance_covered: distance,
                ..RunStats::new(200.0)
            },
        }
    }

    #[test]
    fn test_checkpoint_reward_values() {
        assert_eq!(checkpoint_reward(2), 250.0);
        // 100 + 150 + 225 + 337 + 506
        assert_eq!(checkpoint_reward(5), 1318.0);
    }

    #[test]
    fn test_checkpoint_reward_increments_strictly_increase() {
        let increments: Vec<f32> = (0..30)
            .map(|n| checkpoint_reward(n + 1) - checkpoint_reward(n))
            .collect();
        assert!(increments.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_default_formula() {
        let fitness = FitnessWeights::default().evaluate_run_stats(&stats());
        assert!((fitness - (120.0 + 250.0 + 15.0 - 5.0)).abs() < 1e-3);
    }

    #[test]
    fn test_average_speed_term() {
        let weights = FitnessWeights {
            average_speed: 2.0,
            ..FitnessWeights::default()
        };
        let fitness = weights.evaluate_run_stats(&stats());
        assert!((fitness - (380.0 + 2.0 * 40.0)).abs() < 1e-3);
    }

    #[test]
    fn test_more_distance_is_fitter() {
        let weights = FitnessWeights::default();
        let near = stats();
        let far = RunStats {
            distance_covered: near.distance_covered + 0.5,
            ..near
        };
        assert!(weights.evaluate_run_stats(&far) > weights.evaluate_run_stats(&near));
    }

    #[test]
    fn test_rank_is_descending_and_stable() {
        let population = vec![rankable(1.0), rankable(5.0), rankable(1.0), rankable(3.0)];
        let ranked = rank(&FitnessWeights::default(), &population);
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
        assert!(ranked.windows(2).all(|w| w[0].fitness >= w[1].fitness));
    }

    #[test]
    fn test_invalid_weight_detected() {
        let weights = FitnessWeights {
            survival: f32::INFINITY,
            ..FitnessWeights::default()
        };
        assert_eq!(weights.invalid_field(), Some("survival"));
        assert_eq!(FitnessWeights::default().invalid_field(), None);
    }

    #[test]
    fn test_weights_deserialize_with_defaults() {
        let weights: FitnessWeights = serde_json::from_str(r#"{"average_speed": 2.0}"#).unwrap();
        assert_eq!(weights.distance, 1.0);
        assert_eq!(weights.average_speed, 2.0);
    }
}
