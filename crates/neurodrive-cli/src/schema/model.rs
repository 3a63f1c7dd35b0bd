use chrono::{DateTime, Utc};
use neurodrive_evaluator::policy::PolicySeed;
use serde::{Deserialize, Serialize};

/// A trained policy as written by `neurodrive train --output`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    pub generations: usize,
    pub final_fitness: f32,
    pub dimensions: Vec<usize>,
    pub chromosome: Vec<f32>,
    /// Best fitness of every completed generation.
    #[serde(default)]
    pub fitness_history: Vec<f32>,
}

impl PolicyModel {
    pub(crate) fn to_seed(&self) -> PolicySeed {
        PolicySeed::External {
            dimensions: self.dimensions.clone(),
            chromosome: self.chromosome.clone(),
        }
    }
}
