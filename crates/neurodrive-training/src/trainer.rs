//! Generation orchestrator.
//!
//! A [`Trainer`] owns every piece of mutable training state: the population of
//! policies, the evolution engine, the stagnation tracker, the round counter
//! and the in-progress simulation. Persistence and progress reporting are
//! injected as a [`ChromosomeStore`] and a [`TelemetrySink`].
//!
//! # Generation Cycle
//!
//! ```text
//! spawn vehicles ─▶ simulate until all inactive ─▶ rank ─▶ track stagnation
//!        ▲                                                      │
//!        └──── rebuild population ◀── save elites ◀── evolve ◀──┘
//! ```
//!
//! Simulation is the only long-running step. It checks the trainer's
//! [`CancellationToken`] before every tick; a cancelled generation keeps its
//! simulation, and the next [`run_generation`](Trainer::run_generation) call
//! resumes it from the same tick. Store I/O happens only between generations.

use neurodrive_engine::{
    CancellationToken, SensorArray, ShutOffReason, Simulation, TrackSurface, Vehicle,
};
use neurodrive_evaluator::{
    fitness::{RankableChromosome, rank},
    policy::{InvalidChromosome, NeuralPolicy, PolicySeed},
};
use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::{
    config::{ConfigError, TrainingConfig},
    evolution::EvolutionEngine,
    stats::FitnessStats,
    store::{ChromosomeStore, StoreError},
    telemetry::{TelemetrySink, TrainingEvent},
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainerError {
    #[display("invalid training configuration")]
    Config(ConfigError),
    #[display("failed to access the chromosome store")]
    Store(StoreError),
    #[display("invalid policy chromosome")]
    Chromosome(InvalidChromosome),
}

/// Consecutive generations without a new best checkpoint.
#[derive(Debug, Clone)]
pub struct StagnationTracker {
    max_checkpoint_ever: usize,
    stagnation_count: usize,
    threshold: usize,
    enabled: bool,
}

impl StagnationTracker {
    #[must_use]
    pub fn new(threshold: usize, enabled: bool) -> Self {
        Self {
            max_checkpoint_ever: 0,
            stagnation_count: 0,
            threshold,
            enabled,
        }
    }

    #[must_use]
    pub fn max_checkpoint_ever(&self) -> usize {
        self.max_checkpoint_ever
    }

    #[must_use]
    pub fn stagnation_count(&self) -> usize {
        self.stagnation_count
    }

    /// Whether the next evolution step should hypermutate.
    #[must_use]
    pub fn is_stagnated(&self) -> bool {
        self.enabled && self.stagnation_count >= self.threshold
    }

    /// Records the best checkpoint of a finished generation and returns the
    /// resulting transitions.
    pub fn observe(&mut self, best_checkpoint: usize) -> Vec<TrainingEvent> {
        let mut events = vec![];
        let was_stagnated = self.is_stagnated();
        if best_checkpoint > self.max_checkpoint_ever {
            if was_stagnated {
                events.push(TrainingEvent::HypermutationLeft);
            }
            events.push(TrainingEvent::NewRecord {
                checkpoint: best_checkpoint,
                previous: self.max_checkpoint_ever,
            });
            self.max_checkpoint_ever = best_checkpoint;
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
            if self.enabled && self.stagnation_count == self.threshold {
                events.push(TrainingEvent::HypermutationEntered {
                    generations: self.stagnation_count,
                });
            } else if self.enabled && self.stagnation_count > self.threshold {
                events.push(TrainingEvent::HypermutationActive {
                    generations: self.stagnation_count,
                });
            }
        }
        events
    }
}

/// Summary of a completed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// Round number of the generation, starting at 1.
    pub generation: usize,
    pub best_fitness: f32,
    pub best_checkpoint: usize,
    pub average_checkpoint: f32,
    pub goal_count: usize,
    /// Smallest edge distance averaged over the elites.
    pub average_smallest_edge_distance: f32,
    pub fitness: FitnessStats,
    /// Whether the next generation was produced by hypermutation.
    pub stagnated: bool,
    /// Chromosome and run statistics of the fittest vehicle.
    pub best: RankableChromosome,
}

#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum GenerationStatus {
    Completed(GenerationReport),
    /// The cancellation token was set; the generation resumes on the next call.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum TrainingStatus {
    /// The generation limit was reached.
    Finished,
    Cancelled,
}

/// Evolves a population of policies on one track.
///
/// # Example
///
/// ```
/// use neurodrive_engine::Track;
/// use neurodrive_training::{
///     config::TrainingConfig, store::MemoryStore, telemetry::NullSink, trainer::Trainer,
/// };
///
/// let config = TrainingConfig {
///     population_count: 4,
///     keep_count: 2,
///     max_generation_iterations: 3,
///     max_ticks_per_generation: 300,
///     seed: Some(7),
///     ..TrainingConfig::default()
/// };
/// let track = Track::oval(960, 540, 80.0, 12);
/// let mut trainer = Trainer::new(
///     config,
///     track,
///     Box::new(MemoryStore::new()),
///     Box::new(NullSink),
/// )
/// .unwrap();
///
/// assert!(trainer.train().unwrap().is_finished());
/// assert_eq!(trainer.history().len(), 2);
/// ```
pub struct Trainer<'a, T> {
    config: TrainingConfig,
    track: T,
    sensors: SensorArray,
    policies: Vec<NeuralPolicy>,
    engine: EvolutionEngine<Pcg32>,
    rng: Pcg32,
    store: Box<dyn ChromosomeStore + 'a>,
    sink: Box<dyn TelemetrySink + 'a>,
    stagnation: StagnationTracker,
    round: usize,
    simulation: Option<Simulation>,
    cancel: CancellationToken,
    history: Vec<GenerationReport>,
}

impl<'a, T> Trainer<'a, T>
where
    T: TrackSurface,
{
    /// Validates `config`, builds a random population and seeds it from the
    /// store.
    ///
    /// Stored chromosomes fill population slots in order; slots without a
    /// stored chromosome stay random. A stored chromosome that cannot be
    /// loaded is discarded and its slot stays random.
    pub fn new(
        config: TrainingConfig,
        track: T,
        mut store: Box<dyn ChromosomeStore + 'a>,
        mut sink: Box<dyn TelemetrySink + 'a>,
    ) -> Result<Self, TrainerError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        let engine = EvolutionEngine::new(
            config.population_count,
            config.keep_count,
            config.mutation_rate,
            Pcg32::from_rng(&mut rng),
        );

        let mut policies = (0..config.population_count)
            .map(|_| NeuralPolicy::random(&config.dimensions, &mut rng))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::from)?;

        let stored = store.load()?;
        for (slot, (policy, genes)) in policies.iter_mut().zip(&stored).enumerate() {
            if let Err(reason) = policy.load_chromosome(genes) {
                sink.record(TrainingEvent::SeedDiscarded { slot, reason });
            }
        }
        tracing::debug!(
            stored = stored.len(),
            population = config.population_count,
            "population initialized"
        );

        Ok(Self {
            sensors: SensorArray::new(config.sensor.clone()),
            stagnation: StagnationTracker::new(
                config.stagnation_threshold,
                config.hypermutation_enabled,
            ),
            config,
            track,
            policies,
            engine,
            rng,
            store,
            sink,
            round: 1,
            simulation: None,
            cancel: CancellationToken::new(),
            history: vec![],
        })
    }

    /// Places an externally supplied policy into slot 0.
    ///
    /// The seed is validated strictly: its dimensions must equal the
    /// configured ones and its chromosome must be complete and finite. A
    /// generation in progress is discarded.
    pub fn seed_policy(&mut self, seed: PolicySeed) -> Result<(), TrainerError> {
        if let Some(policy) = seed.into_policy(&self.config.dimensions)? {
            self.policies[0] = policy;
            self.simulation = None;
        }
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    #[must_use]
    pub fn track(&self) -> &T {
        &self.track
    }

    #[must_use]
    pub fn policies(&self) -> &[NeuralPolicy] {
        &self.policies
    }

    /// Round of the next generation to complete, starting at 1.
    #[must_use]
    pub fn round(&self) -> usize {
        self.round
    }

    #[must_use]
    pub fn stagnation(&self) -> &StagnationTracker {
        &self.stagnation
    }

    #[must_use]
    pub fn is_stagnated(&self) -> bool {
        self.stagnation.is_stagnated()
    }

    /// The generation currently being simulated, if any.
    #[must_use]
    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    /// Reports of every completed generation, oldest first.
    #[must_use]
    pub fn history(&self) -> &[GenerationReport] {
        &self.history
    }

    /// Token that stops the running generation before its next tick.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn can_continue(&self) -> bool {
        self.round < self.config.max_generation_iterations
    }

    /// Simulates one generation to completion and evolves the population.
    ///
    /// Clear the cancellation token before calling this again to resume a
    /// cancelled generation.
    pub fn run_generation(&mut self) -> Result<GenerationStatus, TrainerError> {
        if self.simulation.is_none() {
            self.sink.record(TrainingEvent::GenerationStarted {
                round: self.round,
                population: self.policies.len(),
            });
        }
        let simulation = self.simulation.get_or_insert_with(|| {
            Simulation::spawn(
                &self.track,
                self.config.vehicle,
                &self.sensors,
                self.policies.len(),
                &mut self.rng,
                self.config.delta_time,
                self.config.max_ticks_per_generation,
            )
        });

        let status = simulation.run(&self.track, &self.sensors, &mut self.policies, &self.cancel);
        if status.is_cancelled() {
            tracing::debug!(round = self.round, tick = simulation.tick(), "generation cancelled");
            return Ok(GenerationStatus::Cancelled);
        }

        let vehicles = self
            .simulation
            .take()
            .map(Simulation::into_vehicles)
            .unwrap_or_default();
        let report = self.complete_generation(&vehicles)?;
        Ok(GenerationStatus::Completed(report))
    }

    /// Runs generations until the generation limit is reached or the token is
    /// cancelled.
    ///
    /// At least one generation is run.
    pub fn train(&mut self) -> Result<TrainingStatus, TrainerError> {
        loop {
            if self.run_generation()?.is_cancelled() {
                return Ok(TrainingStatus::Cancelled);
            }
            if !self.can_continue() {
                return Ok(TrainingStatus::Finished);
            }
            if self.cancel.is_cancelled() {
                return Ok(TrainingStatus::Cancelled);
            }
        }
    }

    #[expect(clippy::cast_precision_loss)]
    fn complete_generation(&mut self, vehicles: &[Vehicle]) -> Result<GenerationReport, TrainerError> {
        let population: Vec<RankableChromosome> = self
            .policies
            .iter()
            .zip(vehicles)
            .map(|(policy, vehicle)| policy.to_rankable(*vehicle.stats()))
            .collect();
        let ranked = rank(&self.config.fitness, &population);

        let count = population.len().max(1) as f32;
        let average_checkpoint = population
            .iter()
            .map(|c| c.stats.last_checkpoint_passed as f32)
            .sum::<f32>()
            / count;
        let goal_count = vehicles
            .iter()
            .filter(|v| v.has_reached_goal(&self.track))
            .count();
        let elites = &ranked[..self.config.keep_count.min(ranked.len())];
        let average_smallest_edge_distance = elites
            .iter()
            .map(|r| r.chromosome.stats.smallest_edge_distance)
            .sum::<f32>()
            / elites.len().max(1) as f32;
        let best_checkpoint = population
            .iter()
            .map(|c| c.stats.last_checkpoint_passed)
            .max()
            .unwrap_or(0);
        let fitness = FitnessStats::new(ranked.iter().map(|r| r.fitness))
            .expect("population is never empty");
        let best = ranked[0].chromosome.clone();
        let best_fitness = ranked[0].fitness;

        for event in self.stagnation.observe(best_checkpoint) {
            self.sink.record(event);
        }
        let stagnated = self.stagnation.is_stagnated();
        self.sink.record(TrainingEvent::GenerationSummary {
            round: self.round,
            average_checkpoint,
            goal_count,
            population: population.len(),
            average_smallest_edge_distance,
            fitness,
        });

        let next = self
            .engine
            .execute(&self.config.fitness, &population, stagnated);
        let keep = self.config.keep_count.min(next.len());
        self.store.save(&next[..keep])?;
        for (policy, genes) in self.policies.iter_mut().zip(&next) {
            policy.load_chromosome(genes)?;
        }

        let report = GenerationReport {
            generation: self.round,
            best_fitness,
            best_checkpoint,
            average_checkpoint,
            goal_count,
            average_smallest_edge_distance,
            fitness,
            stagnated,
            best,
        };
        self.sink.record(TrainingEvent::GenerationCompleted {
            generation: self.round,
            best_fitness,
        });
        tracing::debug!(
            round = self.round,
            best_fitness,
            best_checkpoint,
            stagnated,
            "generation completed"
        );
        self.history.push(report.clone());
        self.round += 1;
        Ok(report)
    }
}

/// Runs a single policy alone on `track` until it stops and returns its
/// vehicle.
///
/// The run ends after `config.max_ticks_per_generation` ticks at the latest.
pub fn evaluate_policy<T, R>(
    track: &T,
    policy: &mut NeuralPolicy,
    config: &TrainingConfig,
    rng: &mut R,
) -> Vehicle
where
    T: TrackSurface + ?Sized,
    R: Rng + ?Sized,
{
    let sensors = SensorArray::new(config.sensor.clone());
    let mut vehicle = Vehicle::spawn(config.vehicle, track, &sensors, rng);
    for _ in 0..config.max_ticks_per_generation {
        if !vehicle.state().is_active() {
            break;
        }
        vehicle.tick(track, &sensors, policy, config.delta_time);
    }
    vehicle.shut_off(ShutOffReason::TimeLimit);
    vehicle
}

#[cfg(test)]
mod tests {
    use neurodrive_engine::Track;

    use super::*;
    use crate::{store::MemoryStore, telemetry::NullSink};

    fn config() -> TrainingConfig {
        TrainingConfig {
            population_count: 6,
            keep_count: 2,
            max_generation_iterations: 4,
            max_ticks_per_generation: 240,
            seed: Some(99),
            ..TrainingConfig::default()
        }
    }

    fn track() -> Track {
        Track::oval(960, 540, 80.0, 12)
    }

    #[test]
    fn test_stagnation_transitions() {
        let mut tracker = StagnationTracker::new(2, true);
        assert_eq!(
            tracker.observe(1),
            vec![TrainingEvent::NewRecord {
                checkpoint: 1,
                previous: 0
            }]
        );
        assert!(tracker.observe(1).is_empty());
        assert_eq!(
            tracker.observe(0),
            vec![TrainingEvent::HypermutationEntered { generations: 2 }]
        );
        assert!(tracker.is_stagnated());
        assert_eq!(
            tracker.observe(1),
            vec![TrainingEvent::HypermutationActive { generations: 3 }]
        );
        assert_eq!(
            tracker.observe(4),
            vec![
                TrainingEvent::HypermutationLeft,
                TrainingEvent::NewRecord {
                    checkpoint: 4,
                    previous: 1
                }
            ]
        );
        assert!(!tracker.is_stagnated());
        assert_eq!(tracker.max_checkpoint_ever(), 4);
    }

    #[test]
    fn test_disabled_hypermutation_never_stagnates() {
        let mut tracker = StagnationTracker::new(1, false);
        for _ in 0..5 {
            assert!(tracker.observe(0).is_empty());
        }
        assert_eq!(tracker.stagnation_count(), 5);
        assert!(!tracker.is_stagnated());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TrainingConfig {
            keep_count: 6,
            ..config()
        };
        let result = Trainer::new(config, track(), Box::new(MemoryStore::new()), Box::new(NullSink));
        assert!(matches!(
            result,
            Err(TrainerError::Config(ConfigError::KeepCountTooLarge { .. }))
        ));
    }

    #[test]
    fn test_stored_chromosomes_seed_leading_slots() {
        let genes = vec![vec![0.25; 32], vec![-0.25; 32]];
        let mut store = MemoryStore::with_chromosomes(genes.clone());
        let trainer =
            Trainer::new(config(), track(), Box::new(&mut store), Box::new(NullSink)).unwrap();
        assert_eq!(trainer.policies()[0].chromosome(), genes[0]);
        assert_eq!(trainer.policies()[1].chromosome(), genes[1]);
        assert_ne!(trainer.policies()[2].chromosome(), genes[0]);
    }

    #[test]
    fn test_invalid_stored_chromosome_is_discarded() {
        let mut store = MemoryStore::with_chromosomes(vec![vec![f32::NAN; 32]]);
        let mut events: Vec<TrainingEvent> = vec![];
        let trainer =
            Trainer::new(config(), track(), Box::new(&mut store), Box::new(&mut events)).unwrap();
        assert!(trainer.policies()[0].chromosome().iter().all(|g| g.is_finite()));
        drop(trainer);
        assert!(matches!(
            events[0],
            TrainingEvent::SeedDiscarded { slot: 0, .. }
        ));
        let discarded = events
            .iter()
            .filter(|e| matches!(e, TrainingEvent::SeedDiscarded { .. }))
            .count();
        assert_eq!(discarded, 1);
    }

    #[test]
    fn test_external_seed_goes_to_slot_zero() {
        let mut trainer =
            Trainer::new(config(), track(), Box::new(MemoryStore::new()), Box::new(NullSink)).unwrap();
        let chromosome = vec![0.5; 32];
        trainer
            .seed_policy(PolicySeed::External {
                dimensions: vec![5, 4, 3],
                chromosome: chromosome.clone(),
            })
            .unwrap();
        assert_eq!(trainer.policies()[0].chromosome(), chromosome);

        let err = trainer
            .seed_policy(PolicySeed::External {
                dimensions: vec![5, 4, 3],
                chromosome: vec![0.5; 31],
            })
            .unwrap_err();
        assert!(matches!(
            err,
            TrainerError::Chromosome(InvalidChromosome::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_generation_saves_elites_and_advances_round() {
        let mut store = MemoryStore::new();
        let mut trainer =
            Trainer::new(config(), track(), Box::new(&mut store), Box::new(NullSink)).unwrap();
        let status = trainer.run_generation().unwrap();
        let GenerationStatus::Completed(report) = status else {
            panic!("generation was not completed");
        };
        assert_eq!(report.generation, 1);
        assert_eq!(trainer.round(), 2);
        assert_eq!(trainer.policies().len(), 6);
        assert_eq!(trainer.policies()[0].chromosome(), report.best.chromosome);
        assert!(report.fitness.max >= report.fitness.min);
        assert_eq!(report.best_fitness, report.fitness.max);
        drop(trainer);
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.chromosomes().len(), 2);
        assert_eq!(store.chromosomes()[0], report.best.chromosome);
    }

    #[test]
    fn test_cancelled_generation_resumes() {
        let mut trainer =
            Trainer::new(config(), track(), Box::new(MemoryStore::new()), Box::new(NullSink)).unwrap();
        let cancel = trainer.cancellation_token();
        cancel.cancel();
        assert!(trainer.run_generation().unwrap().is_cancelled());
        assert_eq!(trainer.round(), 1);
        assert_eq!(trainer.simulation().map(Simulation::tick), Some(0));

        cancel.reset();
        assert!(trainer.run_generation().unwrap().is_completed());
        assert_eq!(trainer.round(), 2);
        assert!(trainer.simulation().is_none());
    }

    #[test]
    fn test_train_runs_until_limit() {
        let mut trainer =
            Trainer::new(config(), track(), Box::new(MemoryStore::new()), Box::new(NullSink)).unwrap();
        assert_eq!(trainer.train().unwrap(), TrainingStatus::Finished);
        assert_eq!(trainer.round(), 4);
        assert!(!trainer.can_continue());
        let generations: Vec<usize> = trainer.history().iter().map(|r| r.generation).collect();
        assert_eq!(generations, vec![1, 2, 3]);
    }

    #[test]
    fn test_evaluate_policy_stops_vehicle() {
        let config = config();
        let mut policy = NeuralPolicy::zeroed(&config.dimensions).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        let vehicle = evaluate_policy(&track(), &mut policy, &config, &mut rng);
        // zero outputs never accelerate, so the vehicle stalls immediately
        assert!(!vehicle.state().is_active());
        assert_eq!(vehicle.stats().survival_time, 0.0);
    }
}
