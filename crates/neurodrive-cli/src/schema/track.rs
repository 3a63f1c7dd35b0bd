use neurodrive_engine::{Checkpoint, Track, TrackError};
use serde::{Deserialize, Serialize};

/// Track file: a raster of `.` (road) and `#` (wall) cells plus checkpoints
/// in world coordinates.
///
/// ```json
/// {
///   "name": "hairpin",
///   "cell_size": 20.0,
///   "rows": ["#####", "#...#", "#####"],
///   "checkpoints": [[30.0, 30.0], [70.0, 30.0]]
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackFile {
    #[serde(default)]
    pub name: Option<String>,
    pub cell_size: f32,
    pub rows: Vec<String>,
    pub checkpoints: Vec<[f32; 2]>,
}

impl TrackFile {
    pub(crate) fn to_track(&self) -> Result<Track, TrackError> {
        let checkpoints = self
            .checkpoints
            .iter()
            .map(|&[x, y]| Checkpoint::new(x, y))
            .collect();
        Track::from_rows(self.cell_size, &self.rows, checkpoints)
    }
}
