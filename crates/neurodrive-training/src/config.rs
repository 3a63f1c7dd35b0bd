use neurodrive_engine::{SensorConfig, VehicleConfig};
use neurodrive_evaluator::{
    fitness::FitnessWeights,
    policy::{self, InvalidDimensions},
};
use serde::{Deserialize, Serialize};

/// Everything needed to run a training session.
///
/// Deserializes with defaults for missing fields, so a config file only needs
/// to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Layer sizes of every policy, inputs first.
    pub dimensions: Vec<usize>,
    pub population_count: usize,
    /// Number of elites carried over unchanged.
    pub keep_count: usize,
    /// Base per-gene mutation probability.
    pub mutation_rate: f32,
    pub hypermutation_enabled: bool,
    /// Generations without a new best checkpoint before hypermutation starts.
    pub stagnation_threshold: usize,
    pub max_generation_iterations: usize,
    /// Seconds per simulation tick.
    pub delta_time: f32,
    pub max_ticks_per_generation: usize,
    /// Seed for every random choice of the session; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub fitness: FitnessWeights,
    pub vehicle: VehicleConfig,
    pub sensor: SensorConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dimensions: vec![5, 4, 3],
            population_count: 10,
            keep_count: 2,
            mutation_rate: 0.05,
            hypermutation_enabled: true,
            stagnation_threshold: 5,
            max_generation_iterations: 10,
            delta_time: 1.0 / 60.0,
            max_ticks_per_generation: 7200,
            seed: None,
            fitness: FitnessWeights::default(),
            vehicle: VehicleConfig::default(),
            sensor: SensorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ConfigError {
    #[display("population_count must be at least 1")]
    EmptyPopulation,
    #[display("keep_count must be at least 1")]
    NoElites,
    #[display("keep_count ({keep_count}) must be less than population_count ({population_count})")]
    KeepCountTooLarge {
        keep_count: usize,
        population_count: usize,
    },
    #[display("invalid policy dimensions: {_0}")]
    #[from]
    Dimensions(InvalidDimensions),
    #[display("policies take {inputs} inputs but vehicles carry {sensors} sensors")]
    SensorCountMismatch { inputs: usize, sensors: usize },
    #[display("mutation_rate must be in (0, 1], got {_0}")]
    MutationRate(#[error(not(source))] f32),
    #[display("max_generation_iterations must be at least 1")]
    NoGenerations,
    #[display("delta_time must be a positive number, got {_0}")]
    DeltaTime(#[error(not(source))] f32),
    #[display("max_ticks_per_generation must be at least 1")]
    NoTicks,
    #[display("invalid vehicle setting `{_0}`")]
    Vehicle(#[error(not(source))] &'static str),
    #[display("invalid sensor setting `{_0}`")]
    Sensor(#[error(not(source))] &'static str),
    #[display("invalid fitness weight `{_0}`")]
    Fitness(#[error(not(source))] &'static str),
}

impl TrainingConfig {
    /// Rejects configurations no generation can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_count == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.keep_count == 0 {
            return Err(ConfigError::NoElites);
        }
        if self.keep_count >= self.population_count {
            return Err(ConfigError::KeepCountTooLarge {
                keep_count: self.keep_count,
                population_count: self.population_count,
            });
        }
        policy::validate_dimensions(&self.dimensions)?;
        if !(self.mutation_rate > 0.0 && self.mutation_rate <= 1.0) {
            return Err(ConfigError::MutationRate(self.mutation_rate));
        }
        if self.max_generation_iterations == 0 {
            return Err(ConfigError::NoGenerations);
        }
        if !(self.delta_time.is_finite() && self.delta_time > 0.0) {
            return Err(ConfigError::DeltaTime(self.delta_time));
        }
        if self.max_ticks_per_generation == 0 {
            return Err(ConfigError::NoTicks);
        }
        if let Some(field) = self.vehicle.invalid_field() {
            return Err(ConfigError::Vehicle(field));
        }
        if let Some(field) = self.sensor.invalid_field() {
            return Err(ConfigError::Sensor(field));
        }
        if let Some(field) = self.fitness.invalid_field() {
            return Err(ConfigError::Fitness(field));
        }
        let sensors = self.sensor.sensor_count();
        if self.dimensions[0] != sensors {
            return Err(ConfigError::SensorCountMismatch {
                inputs: self.dimensions[0],
                sensors,
            });
        }
        Ok(())
    }
}
