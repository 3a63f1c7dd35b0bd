//! Distance sensors ("radars") probing the track surface.
//!
//! Every vehicle carries the same fixed fan of sensors. A sensor walks a ray
//! from the vehicle's forward reference point in fixed steps until it leaves the
//! road or reaches its maximum range; the walked length, divided by the range,
//! is the reading fed to the policy.
//!
//! Probing is a pure function of the surface and the pose, so the same pose on
//! the same track always yields the same readings.

use crate::{SensorConfig, TrackSurface};

/// Position and heading of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    /// Heading in degrees; 0° points along `+x`.
    pub heading: f32,
}

impl Pose {
    #[must_use]
    pub const fn new(x: f32, y: f32, heading: f32) -> Self {
        Self { x, y, heading }
    }

    /// Returns the point `distance` units ahead along `heading + angle`.
    #[must_use]
    pub fn project(&self, angle: f32, distance: f32) -> (f32, f32) {
        let radians = (self.heading + angle).to_radians();
        (
            self.x + distance * radians.cos(),
            self.y + distance * radians.sin(),
        )
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Probe angle relative to the heading, in degrees.
    pub angle: f32,
    /// Walked length, at most the sensor range.
    pub length: f32,
    /// `length / max_range`, in `[0, 1]`.
    pub normalized: f32,
    /// `true` if the probe stopped on a wall before reaching its range.
    pub collided: bool,
}

/// The fixed fan of sensors shared by every vehicle.
///
/// # Example
///
/// ```
/// use neurodrive_engine::{Pose, SensorArray, SensorConfig, Track, TrackSurface as _};
///
/// let track = Track::oval(960, 540, 80.0, 8);
/// let sensors = SensorArray::new(SensorConfig::default());
/// let first = track.checkpoints()[0];
///
/// let mut readings = vec![];
/// sensors.probe(&track, Pose::new(first.x, first.y, 0.0), &mut readings);
///
/// assert_eq!(readings.len(), 5);
/// assert!(readings.iter().all(|r| (0.0..=1.0).contains(&r.normalized)));
/// ```
#[derive(Debug, Clone)]
pub struct SensorArray {
    config: SensorConfig,
}

impl SensorArray {
    #[must_use]
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    #[must_use]
    pub fn sensor_count(&self) -> usize {
        self.config.sensor_count()
    }

    #[must_use]
    pub fn max_range(&self) -> f32 {
        self.config.max_range
    }

    /// Probes every sensor angle in order, replacing the contents of `readings`.
    ///
    /// `readings` is reused across ticks so probing does not allocate once the
    /// buffer has grown to the sensor count.
    pub fn probe<S>(&self, surface: &S, pose: Pose, readings: &mut Vec<SensorReading>)
    where
        S: TrackSurface + ?Sized,
    {
        readings.clear();
        readings.extend(
            self.config
                .angles
                .iter()
                .map(|&angle| self.probe_angle(surface, pose, angle)),
        );
    }

    /// Probes a single angle relative to the pose heading.
    ///
    /// The origin point itself is tested first: a vehicle whose reference
    /// point is off the road reads a zero length.
    #[must_use]
    pub fn probe_angle<S>(&self, surface: &S, pose: Pose, angle: f32) -> SensorReading
    where
        S: TrackSurface + ?Sized,
    {
        let SensorConfig {
            max_range,
            step,
            origin_offset,
            ..
        } = self.config;
        let (ox, oy) = pose.project(0.0, origin_offset);
        let origin = Pose::new(ox, oy, pose.heading);

        let mut length = 0.0;
        let (mut x, mut y) = (ox, oy);
        while length < max_range && surface.is_road(x, y) {
            length += step;
            (x, y) = origin.project(angle, length);
        }

        let length = f32::min(length, max_range);
        SensorReading {
            angle,
            length,
            normalized: length / max_range,
            collided: length < max_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Checkpoint, Track};

    struct HalfPlane {
        wall_x: f32,
    }

    impl TrackSurface for HalfPlane {
        fn is_road(&self, x: f32, _y: f32) -> bool {
            x < self.wall_x
        }

        fn checkpoints(&self) -> &[Checkpoint] {
            &[]
        }
    }

    struct OpenField;

    impl TrackSurface for OpenField {
        fn is_road(&self, _x: f32, _y: f32) -> bool {
            true
        }

        fn checkpoints(&self) -> &[Checkpoint] {
            &[]
        }
    }

    #[test]
    fn test_forward_probe_stops_at_wall() {
        let sensors = SensorArray::new(SensorConfig::default());
        let reading = sensors.probe_angle(&HalfPlane { wall_x: 51.0 }, Pose::default(), 0.0);
        // points at 0, 2, ..., 50 are road; 52 is the first wall point
        assert!((reading.length - 52.0).abs() < 1e-3);
        assert!((reading.normalized - 0.26).abs() < 1e-5);
        assert!(reading.collided);
    }

    #[test]
    fn test_probe_saturates_at_max_range() {
        let sensors = SensorArray::new(SensorConfig::default());
        let mut readings = vec![];
        sensors.probe(&OpenField, Pose::new(10.0, 10.0, 45.0), &mut readings);
        assert_eq!(readings.len(), 5);
        for reading in &readings {
            assert_eq!(reading.length, 200.0);
            assert_eq!(reading.normalized, 1.0);
            assert!(!reading.collided);
        }
    }

    #[test]
    fn test_off_road_origin_reads_zero() {
        let sensors = SensorArray::new(SensorConfig::default());
        let mut readings = vec![];
        sensors.probe(
            &HalfPlane { wall_x: 0.0 },
            Pose::new(5.0, 0.0, 0.0),
            &mut readings,
        );
        assert!(readings.iter().all(|r| r.length == 0.0 && r.collided));
    }

    #[test]
    fn test_readings_follow_angle_order() {
        let sensors = SensorArray::new(SensorConfig::default());
        let mut readings = vec![];
        // wall straight ahead: the forward sensor is the shortest
        sensors.probe(&HalfPlane { wall_x: 40.0 }, Pose::default(), &mut readings);
        let angles: Vec<f32> = readings.iter().map(|r| r.angle).collect();
        assert_eq!(angles, vec![-70.0, -35.0, 0.0, 35.0, 70.0]);
        assert!(readings[2].length < readings[1].length);
        assert!(readings[1].length < readings[0].length);
        assert_eq!(readings[1].length, readings[3].length);
    }

    #[test]
    fn test_origin_offset_moves_probe_forward() {
        let sensors = SensorArray::new(SensorConfig {
            origin_offset: 20.0,
            ..SensorConfig::default()
        });
        let reading = sensors.probe_angle(&HalfPlane { wall_x: 51.0 }, Pose::default(), 0.0);
        assert!((reading.length - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_probe_on_raster_track() {
        let track = Track::from_rows(
            10.0,
            ["##########", "#........#", "##########"],
            vec![Checkpoint::new(15.0, 15.0)],
        )
        .unwrap();
        let sensors = SensorArray::new(SensorConfig::default());
        let reading = sensors.probe_angle(&track, Pose::new(15.0, 15.0, 0.0), 0.0);
        // road ends at x = 90
        assert!((reading.length - 76.0).abs() < 1e-3);
        let reading = sensors.probe_angle(&track, Pose::new(15.0, 15.0, 0.0), 90.0);
        assert!((reading.length - 6.0).abs() < 1e-3);
    }
}
