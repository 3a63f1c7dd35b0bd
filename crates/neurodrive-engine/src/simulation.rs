//! Fixed-step simulation of a whole population.
//!
//! [`Simulation`] owns one [`Vehicle`] per policy and advances all active
//! vehicles in lockstep. Vehicles never interact, so the order in which they
//! are updated within a tick does not matter.
//!
//! Running a simulation to completion can take a long time, so
//! [`Simulation::run`] checks a [`CancellationToken`] before every tick. A
//! cancelled simulation is left exactly as it was after its last complete tick
//! and can be resumed by calling `run` again.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use rand::Rng;

use crate::{Driver, SensorArray, ShutOffReason, TrackSurface, Vehicle, VehicleConfig};

/// Shared flag used to stop a running simulation between ticks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clears a previous cancellation so the simulation can be resumed.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum SimulationStatus {
    /// Every vehicle is inactive.
    Finished,
    /// The cancellation token was set before the next tick.
    Cancelled,
}

/// Lockstep simulation of a population of vehicles.
#[derive(Debug, Clone)]
pub struct Simulation {
    vehicles: Vec<Vehicle>,
    tick: usize,
    delta_time: f32,
    max_ticks: usize,
}

impl Simulation {
    /// Creates a simulation over already placed vehicles.
    ///
    /// After `max_ticks` ticks every remaining vehicle is shut off with
    /// [`ShutOffReason::TimeLimit`].
    #[must_use]
    pub fn new(vehicles: Vec<Vehicle>, delta_time: f32, max_ticks: usize) -> Self {
        Self {
            vehicles,
            tick: 0,
            delta_time,
            max_ticks,
        }
    }

    /// Spawns `count` vehicles on the first checkpoint of `track`.
    pub fn spawn<S, R>(
        track: &S,
        vehicle_config: VehicleConfig,
        sensors: &SensorArray,
        count: usize,
        rng: &mut R,
        delta_time: f32,
        max_ticks: usize,
    ) -> Self
    where
        S: TrackSurface + ?Sized,
        R: Rng + ?Sized,
    {
        let vehicles = (0..count)
            .map(|_| Vehicle::spawn(vehicle_config, track, sensors, rng))
            .collect();
        Self::new(vehicles, delta_time, max_ticks)
    }

    #[must_use]
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    #[must_use]
    pub fn into_vehicles(self) -> Vec<Vehicle> {
        self.vehicles
    }

    /// Number of ticks simulated so far.
    #[must_use]
    pub fn tick(&self) -> usize {
        self.tick
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.vehicles
            .iter()
            .filter(|v| v.state().is_active())
            .count()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.active_count() == 0
    }

    /// Advances every active vehicle by one tick and returns how many are
    /// still active.
    ///
    /// `drivers[i]` drives `vehicles[i]`.
    ///
    /// # Panics
    ///
    /// Panics if the number of drivers differs from the number of vehicles.
    pub fn step<S, D>(&mut self, track: &S, sensors: &SensorArray, drivers: &mut [D]) -> usize
    where
        S: TrackSurface + ?Sized,
        D: Driver,
    {
        assert_eq!(
            drivers.len(),
            self.vehicles.len(),
            "every vehicle needs exactly one driver"
        );
        let mut active = 0;
        for (vehicle, driver) in self.vehicles.iter_mut().zip(drivers) {
            if !vehicle.state().is_active() {
                continue;
            }
            vehicle.tick(track, sensors, driver, self.delta_time);
            if vehicle.state().is_active() {
                active += 1;
            }
        }
        self.tick += 1;
        active
    }

    /// Runs ticks until every vehicle is inactive or `cancel` is set.
    ///
    /// Cancellation is only observed between ticks, never in the middle of one.
    pub fn run<S, D>(
        &mut self,
        track: &S,
        sensors: &SensorArray,
        drivers: &mut [D],
        cancel: &CancellationToken,
    ) -> SimulationStatus
    where
        S: TrackSurface + ?Sized,
        D: Driver,
    {
        loop {
            if self.is_finished() {
                return SimulationStatus::Finished;
            }
            if self.tick >= self.max_ticks {
                for vehicle in &mut self.vehicles {
                    vehicle.shut_off(ShutOffReason::TimeLimit);
                }
                return SimulationStatus::Finished;
            }
            if cancel.is_cancelled() {
                return SimulationStatus::Cancelled;
            }
            self.step(track, sensors, drivers);
        }
    }
}
