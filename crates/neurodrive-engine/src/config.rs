use serde::{Deserialize, Serialize};

/// Physical constants governing vehicle motion.
///
/// All speeds and accelerations are expressed per reference tick (1/60 s);
/// [`Vehicle::tick`](crate::Vehicle::tick) rescales them by `delta_time * 60`
/// so the motion is independent of the actual tick rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Upper bound of the scalar speed.
    pub max_speed: f32,
    /// Fraction of `max_speed` above which steering authority starts to decay.
    pub slipping_speed_ratio: f32,
    /// Linear drag subtracted from the speed every tick.
    pub deceleration: f32,
    /// Speed gained on a tick with positive throttle.
    pub acceleration: f32,
    /// Extra drag applied while braking, as a multiple of `deceleration`.
    pub brake_multiplier: f32,
    /// Degrees of heading change per unit of steer, speed and reference tick.
    pub turn_gain: f32,
    /// Fraction of the speed lost per tick after the vehicle shut off.
    pub coast_decay: f32,
    /// Width of the random vertical offset applied to the spawn position.
    pub spawn_jitter: f32,
    /// Distance within which a checkpoint counts as hit.
    pub checkpoint_radius: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_speed: 6.0,
            slipping_speed_ratio: 0.75,
            deceleration: 0.05,
            acceleration: 0.1,
            brake_multiplier: 6.0,
            turn_gain: 3.0,
            coast_decay: 0.05,
            spawn_jitter: 43.0,
            checkpoint_radius: 40.0,
        }
    }
}

impl VehicleConfig {
    /// Speed above which steering authority decays.
    #[must_use]
    pub fn slipping_speed(&self) -> f32 {
        self.max_speed * self.slipping_speed_ratio
    }

    /// Returns the name of the first field that is not a finite, non-negative
    /// number (or, for `max_speed`, not strictly positive).
    #[must_use]
    pub fn invalid_field(&self) -> Option<&'static str> {
        let fields = [
            ("max_speed", self.max_speed, true),
            ("slipping_speed_ratio", self.slipping_speed_ratio, false),
            ("deceleration", self.deceleration, false),
            ("acceleration", self.acceleration, false),
            ("brake_multiplier", self.brake_multiplier, false),
            ("turn_gain", self.turn_gain, false),
            ("coast_decay", self.coast_decay, false),
            ("spawn_jitter", self.spawn_jitter, false),
            ("checkpoint_radius", self.checkpoint_radius, false),
        ];
        fields
            .into_iter()
            .find(|(_, value, strict)| !is_valid_constant(*value, *strict))
            .map(|(name, _, _)| name)
    }
}

/// Geometry of the distance sensors mounted on every vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Probe angles in degrees, relative to the vehicle heading.
    pub angles: Vec<f32>,
    /// Maximum probe length; readings are normalized by this value.
    pub max_range: f32,
    /// Distance between two consecutive probe points.
    pub step: f32,
    /// Distance of the probe origin ahead of the vehicle position.
    pub origin_offset: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            angles: vec![-70.0, -35.0, 0.0, 35.0, 70.0],
            max_range: 200.0,
            step: 2.0,
            origin_offset: 0.0,
        }
    }
}

impl SensorConfig {
    /// Number of readings produced per probe.
    #[must_use]
    pub fn sensor_count(&self) -> usize {
        self.angles.len()
    }

    /// Returns the name of the first invalid field, if any.
    #[must_use]
    pub fn invalid_field(&self) -> Option<&'static str> {
        if self.angles.is_empty() || self.angles.iter().any(|a| !a.is_finite()) {
            return Some("angles");
        }
        if !is_valid_constant(self.max_range, true) {
            return Some("max_range");
        }
        if !is_valid_constant(self.step, true) {
            return Some("step");
        }
        if !self.origin_offset.is_finite() {
            return Some("origin_offset");
        }
        None
    }
}

fn is_valid_constant(value: f32, strictly_positive: bool) -> bool {
    value.is_finite() && if strictly_positive { value > 0.0 } else { value >= 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(VehicleConfig::default().invalid_field(), None);
        assert_eq!(SensorConfig::default().invalid_field(), None);
        assert_eq!(SensorConfig::default().sensor_count(), 5);
    }

    #[test]
    fn test_slipping_speed() {
        let config = VehicleConfig::default();
        assert!((config.slipping_speed() - 4.5).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let config = VehicleConfig {
            max_speed: 0.0,
            ..VehicleConfig::default()
        };
        assert_eq!(config.invalid_field(), Some("max_speed"));

        let config = VehicleConfig {
            deceleration: f32::NAN,
            ..VehicleConfig::default()
        };
        assert_eq!(config.invalid_field(), Some("deceleration"));

        let config = SensorConfig {
            angles: vec![],
            ..SensorConfig::default()
        };
        assert_eq!(config.invalid_field(), Some("angles"));

        let config = SensorConfig {
            step: -1.0,
            ..SensorConfig::default()
        };
        assert_eq!(config.invalid_field(), Some("step"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: VehicleConfig = serde_json::from_str(r#"{"max_speed": 8.0}"#).unwrap();
        assert_eq!(config.max_speed, 8.0);
        assert_eq!(config.acceleration, 0.1);
    }
}
