//! Evolutionary training of vehicle policies.
//!
//! This crate turns the simulation and evaluation crates into a training loop.
//! A population of [`NeuralPolicy`](neurodrive_evaluator::policy::NeuralPolicy)
//! drives on a track, every run is scored, and a genetic algorithm builds the
//! next population from the best runs.
//!
//! # How Training Works
//!
//! 1. **Simulate** - every policy drives its own vehicle until all vehicles
//!    have stopped (see [`trainer`])
//! 2. **Rank** - runs are ranked by fitness
//!    ([`neurodrive_evaluator::fitness`])
//! 3. **Track Stagnation** - generations without a new best checkpoint are
//!    counted; after enough of them the next step hypermutates
//! 4. **Evolve** - elites survive unchanged, the rest of the population is
//!    bred from them by crossover and mutation (see [`evolution`])
//! 5. **Persist** - the elites are handed to a [`ChromosomeStore`](store::ChromosomeStore)
//!
//! # Architecture
//!
//! ```text
//! Trainer (trainer)
//!     ├─ Simulation, SensorArray, Vehicle (neurodrive-engine)
//!     ├─ NeuralPolicy, fitness ranking (neurodrive-evaluator)
//!     ├─ EvolutionEngine (evolution) ─ gene operators (weights)
//!     ├─ ChromosomeStore (store)
//!     └─ TelemetrySink (telemetry)
//! ```
//!
//! # Determinism
//!
//! With [`TrainingConfig::seed`](config::TrainingConfig::seed) set, a session is
//! fully reproducible. Vehicle spawning and the evolution engine draw from
//! separate generators, both derived from the seed.
//!
//! # Current Limitations
//!
//! - **Single track**: a session trains on one track; policies overfit to it
//! - **Sequential simulation**: vehicles are ticked on one thread
//! - **Fixed topology**: only weights evolve, never layer sizes

pub mod config;
pub mod evolution;
pub mod stats;
pub mod store;
pub mod telemetry;
pub mod trainer;
pub mod weights;
