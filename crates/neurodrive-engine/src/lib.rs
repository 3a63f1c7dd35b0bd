//! Headless driving simulation for evolving vehicle controllers.
//!
//! This crate provides everything that happens *during* a generation:
//!
//! - [`Track`] / [`TrackSurface`] - road raster and ordered checkpoints
//! - [`SensorArray`] - fixed fan of distance probes against the road surface
//! - [`Vehicle`] - kinematic vehicle model with checkpoint bookkeeping
//! - [`Simulation`] - lockstep, cancellable tick driver over a population
//!
//! Policies plug in through the [`Driver`] trait, which maps normalized sensor
//! readings to [`Controls`]. The crate knows nothing about neural networks or
//! evolution; those live in `neurodrive-evaluator` and `neurodrive-training`.
//!
//! # Tick Pipeline
//!
//! ```text
//! SensorArray::probe ─▶ Driver::drive ─▶ Vehicle kinematics ─▶ road / checkpoint checks
//! ```
//!
//! Everything in a tick is deterministic: the only randomness in this crate is
//! the spawn offset drawn when a [`Simulation`] is created.

pub use self::{config::*, sensor::*, simulation::*, track::*, vehicle::*};

mod config;
mod sensor;
mod simulation;
mod track;
mod vehicle;
