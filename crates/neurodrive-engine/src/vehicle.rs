//! Vehicle kinematics and per-run bookkeeping.
//!
//! A [`Vehicle`] is a point mass with a heading and a scalar speed. Each
//! [`tick`](Vehicle::tick) it probes the track, asks its [`Driver`] for
//! [`Controls`], integrates speed, heading and position under a fixed time step,
//! and then checks the road surface and the checkpoints.
//!
//! # State Machine
//!
//! ```text
//! Active ──(speed ≤ 0 | off road | wrong-way checkpoint | time limit)──▶ Inactive
//! ```
//!
//! `Inactive` is terminal for the generation. An inactive vehicle no longer
//! senses, drives or accumulates statistics; if it is still ticked it only
//! coasts to a stop.
//!
//! # Reference Rate
//!
//! Speeds are expressed per reference tick of 1/60 s. Every displacement and
//! heading change is scaled by `delta_time * 60`, so halving the tick rate
//! doubles the per-tick motion instead of halving the vehicle's speed.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Pose, SensorArray, SensorReading, TrackSurface, VehicleConfig};

/// Number of reference ticks per second.
const REFERENCE_RATE: f32 = 60.0;

/// Throttle output above which the vehicle accelerates.
const ACCELERATION_THRESHOLD: f32 = 0.0;

/// Brake output above which the extra brake drag applies.
const BRAKE_THRESHOLD: f32 = 0.5;

/// Control vector produced by a policy for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Controls {
    pub acceleration: f32,
    pub steer: f32,
    pub brake: f32,
}

impl Controls {
    /// Reads `[acceleration, steer, brake]` from a policy output.
    ///
    /// Missing outputs read as 0 and extra outputs are ignored.
    #[must_use]
    pub fn from_outputs(outputs: &[f32]) -> Self {
        let get = |i: usize| outputs.get(i).copied().unwrap_or(0.0);
        Self {
            acceleration: get(0),
            steer: get(1),
            brake: get(2),
        }
    }
}

/// Maps sensor readings to controls.
///
/// Implemented by the neural policy; closures are accepted too, which keeps
/// hand-written drivers in tests short.
pub trait Driver {
    fn drive(&mut self, inputs: &[f32]) -> Controls;
}

impl<F> Driver for F
where
    F: FnMut(&[f32]) -> Controls,
{
    fn drive(&mut self, inputs: &[f32]) -> Controls {
        self(inputs)
    }
}

/// Why a vehicle stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ShutOffReason {
    /// Speed dropped to zero.
    #[display("stalled")]
    Stalled,
    /// The vehicle position left the road.
    #[display("off road")]
    OffRoad,
    /// An earlier checkpoint than the last one passed was hit.
    #[display("wrong way")]
    WrongWay,
    /// The generation ran out of ticks.
    #[display("time limit")]
    TimeLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum VehicleState {
    Active,
    Inactive(ShutOffReason),
}

/// Statistics accumulated over one run, used as fitness inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Index of the last checkpoint passed in sequence.
    pub last_checkpoint_passed: usize,
    /// Total path length driven while active.
    pub distance_covered: f32,
    /// Seconds spent active.
    pub survival_time: f32,
    /// Time integral of `1 - mean_sensor_length / max_range` while active.
    pub wall_proximity_penalty: f32,
    /// Shortest sensor length ever observed.
    pub smallest_edge_distance: f32,
}

impl RunStats {
    /// Fresh statistics; the smallest edge distance starts at the sensor range.
    #[must_use]
    pub const fn new(max_range: f32) -> Self {
        Self {
            last_checkpoint_passed: 0,
            distance_covered: 0.0,
            survival_time: 0.0,
            wall_proximity_penalty: 0.0,
            smallest_edge_distance: max_range,
        }
    }

    /// Average speed over the run in distance units per second.
    #[must_use]
    pub fn average_speed(&self) -> f32 {
        if self.survival_time > 0.0 {
            self.distance_covered / self.survival_time
        } else {
            0.0
        }
    }
}

/// A simulated vehicle bound to one policy for one generation.
///
/// # Example
///
/// ```
/// use neurodrive_engine::{
///     Controls, Pose, SensorArray, SensorConfig, Track, TrackSurface as _, Vehicle,
///     VehicleConfig,
/// };
///
/// let track = Track::oval(960, 540, 80.0, 8);
/// let sensors = SensorArray::new(SensorConfig::default());
/// let start = track.checkpoints()[0];
/// let mut vehicle = Vehicle::new(
///     VehicleConfig::default(),
///     Pose::new(start.x, start.y, 0.0),
///     sensors.max_range(),
/// );
///
/// let mut full_throttle = |_: &[f32]| Controls { acceleration: 1.0, ..Controls::default() };
/// vehicle.tick(&track, &sensors, &mut full_throttle, 1.0 / 60.0);
///
/// assert!(vehicle.state().is_active());
/// assert!(vehicle.speed() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Vehicle {
    config: VehicleConfig,
    pose: Pose,
    speed: f32,
    state: VehicleState,
    stats: RunStats,
    readings: Vec<SensorReading>,
    inputs: Vec<f32>,
}

impl Vehicle {
    #[must_use]
    pub fn new(config: VehicleConfig, pose: Pose, max_range: f32) -> Self {
        Self {
            config,
            pose,
            speed: 0.0,
            state: VehicleState::Active,
            stats: RunStats::new(max_range),
            readings: vec![],
            inputs: vec![],
        }
    }

    /// Places a vehicle on the first checkpoint with a random vertical offset
    /// of up to half the configured spawn jitter, heading along `+x`.
    pub fn spawn<S, R>(config: VehicleConfig, track: &S, sensors: &SensorArray, rng: &mut R) -> Self
    where
        S: TrackSurface + ?Sized,
        R: Rng + ?Sized,
    {
        let (x, y) = track
            .checkpoints()
            .first()
            .map_or((0.0, 0.0), |cp| (cp.x, cp.y));
        let offset = (rng.random::<f32>() - 0.5) * config.spawn_jitter;
        Self::new(config, Pose::new(x, y + offset, 0.0), sensors.max_range())
    }

    #[must_use]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[must_use]
    pub fn state(&self) -> VehicleState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Readings of the most recent probe, for rendering.
    #[must_use]
    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    /// Normalized readings most recently fed to the driver.
    #[must_use]
    pub fn inputs(&self) -> &[f32] {
        &self.inputs
    }

    /// Returns `true` if the goal checkpoint of `track` has been passed.
    #[must_use]
    pub fn has_reached_goal<S>(&self, track: &S) -> bool
    where
        S: TrackSurface + ?Sized,
    {
        track
            .goal_index()
            .is_some_and(|goal| self.stats.last_checkpoint_passed == goal)
    }

    /// Steering authority: 1 up to the slipping speed, then decaying linearly.
    #[must_use]
    pub fn steer_impact(&self) -> f32 {
        let slipping_speed = self.config.slipping_speed();
        if self.speed > slipping_speed {
            1.0 - (self.speed - slipping_speed) / self.config.max_speed
        } else {
            1.0
        }
    }

    /// Advances the vehicle by one tick of `delta_time` seconds.
    ///
    /// Returns the shut-off reason if the vehicle became inactive during this
    /// tick.
    pub fn tick<S, D>(
        &mut self,
        track: &S,
        sensors: &SensorArray,
        driver: &mut D,
        delta_time: f32,
    ) -> Option<ShutOffReason>
    where
        S: TrackSurface + ?Sized,
        D: Driver + ?Sized,
    {
        let was_active = self.state.is_active();
        let scale = delta_time * REFERENCE_RATE;
        let mut mean_length = sensors.max_range();

        self.speed -= self.config.deceleration;

        if self.state.is_active() {
            mean_length = self.sense(track, sensors);
            let controls = driver.drive(&self.inputs);
            self.apply_controls(controls, scale);
        } else {
            self.speed -= self.config.coast_decay * self.speed;
            self.speed = self.speed.max(0.0);
        }

        if self.speed <= 0.0 && self.state.is_active() {
            self.speed = 0.0;
            self.shut_off(ShutOffReason::Stalled);
        }

        let displacement = self.speed * scale;
        (self.pose.x, self.pose.y) = self.pose.project(0.0, displacement);

        if self.state.is_active() {
            self.stats.distance_covered += displacement.abs();
            self.stats.survival_time += delta_time;
            let proximity = 1.0 - mean_length / sensors.max_range();
            self.stats.wall_proximity_penalty += proximity * delta_time;

            if !track.is_road(self.pose.x, self.pose.y) {
                self.shut_off(ShutOffReason::OffRoad);
            }
        }

        if self.state.is_active() {
            let radius = self.config.checkpoint_radius;
            for (id, cp) in track.checkpoints().iter().enumerate() {
                if cp.distance_to(self.pose.x, self.pose.y) < radius {
                    self.hit_checkpoint(id);
                    if !self.state.is_active() {
                        break;
                    }
                }
            }
        }

        match self.state {
            VehicleState::Inactive(reason) if was_active => Some(reason),
            _ => None,
        }
    }

    /// Registers a hit on checkpoint `id`.
    ///
    /// Only the next checkpoint in sequence advances progress. Hitting an
    /// earlier checkpoint than the last one passed shuts the vehicle off;
    /// skipping ahead is ignored.
    pub fn hit_checkpoint(&mut self, id: usize) {
        let last = self.stats.last_checkpoint_passed;
        if id == last + 1 {
            self.stats.last_checkpoint_passed = id;
        } else if id < last {
            self.shut_off(ShutOffReason::WrongWay);
        }
    }

    /// Makes the vehicle inactive. Already inactive vehicles keep their
    /// original reason.
    pub fn shut_off(&mut self, reason: ShutOffReason) {
        if self.state.is_active() {
            self.state = VehicleState::Inactive(reason);
        }
    }

    /// Probes the track, refreshes the driver inputs and returns the mean raw
    /// sensor length.
    #[expect(clippy::cast_precision_loss)]
    fn sense<S>(&mut self, track: &S, sensors: &SensorArray) -> f32
    where
        S: TrackSurface + ?Sized,
    {
        sensors.probe(track, self.pose, &mut self.readings);
        self.inputs.clear();
        self.inputs
            .extend(self.readings.iter().map(|r| r.normalized));

        let mut total = 0.0;
        for reading in &self.readings {
            total += reading.length;
            self.stats.smallest_edge_distance =
                f32::min(self.stats.smallest_edge_distance, reading.length);
        }
        if self.readings.is_empty() {
            sensors.max_range()
        } else {
            total / self.readings.len() as f32
        }
    }

    fn apply_controls(&mut self, controls: Controls, scale: f32) {
        let config = &self.config;
        if controls.brake > BRAKE_THRESHOLD {
            self.speed -= config.deceleration * config.brake_multiplier;
        }
        if controls.acceleration > ACCELERATION_THRESHOLD {
            self.speed += config.acceleration;
        }
        self.speed = self.speed.clamp(0.0, config.max_speed);

        let steer_impact = self.steer_impact();
        self.pose.heading +=
            controls.steer * self.speed * steer_impact * scale * self.config.turn_gain;
    }
}
