//! Track surfaces: where the road is and where the checkpoints are.
//!
//! The simulation only ever asks two questions of a track: "is this point on
//! the road?" and "where are the checkpoints?". [`TrackSurface`] captures that
//! contract so tests and hosts can plug in their own surfaces; [`Track`] is the
//! raster implementation used by the trainer.
//!
//! # Coordinate System
//!
//! World coordinates grow rightwards (`x`) and downwards (`y`), matching the
//! screen coordinates of the images tracks are usually drawn from. A heading
//! of 0° points along `+x`, and positive headings turn clockwise on screen.

use serde::{Deserialize, Serialize};

/// Glyph marking a road cell in a textual raster.
pub const ROAD_GLYPH: char = '.';
/// Glyph marking a wall cell in a textual raster.
pub const WALL_GLYPH: char = '#';

/// A checkpoint position in world coordinates.
///
/// Checkpoints are ordered: vehicles must pass them in sequence, and the last
/// checkpoint of a track is its goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub x: f32,
    pub y: f32,
}

impl Checkpoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance from this checkpoint to `(x, y)`.
    #[must_use]
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        f32::hypot(self.x - x, self.y - y)
    }
}

/// Read-only view of a track shared by every vehicle of a generation.
pub trait TrackSurface {
    /// Returns `true` if `(x, y)` lies on the road.
    ///
    /// Points outside the track bounds are never road.
    fn is_road(&self, x: f32, y: f32) -> bool;

    /// Ordered checkpoints; the last one is the goal.
    fn checkpoints(&self) -> &[Checkpoint];

    /// Index of the goal checkpoint, or `None` for a track without checkpoints.
    fn goal_index(&self) -> Option<usize> {
        self.checkpoints().len().checked_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum TrackError {
    #[display("track raster is empty")]
    EmptyRaster,
    #[display("cell size must be a positive finite number, got {_0}")]
    InvalidCellSize(#[error(not(source))] f32),
    #[display("raster row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[display("unknown glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        row: usize,
        column: usize,
        glyph: char,
    },
    #[display("raster holds {actual} cells, expected {expected}")]
    CellCountMismatch { expected: usize, actual: usize },
    #[display("track has no checkpoints")]
    NoCheckpoints,
}

/// A rasterized track: a grid of road/wall cells plus ordered checkpoints.
///
/// Each cell covers a `cell_size × cell_size` square of world space. The grid is
/// immutable once built.
///
/// # Example
///
/// ```
/// use neurodrive_engine::{Checkpoint, Track, TrackSurface};
///
/// let track = Track::from_rows(
///     10.0,
///     ["#####", "#...#", "#####"],
///     vec![Checkpoint::new(15.0, 15.0), Checkpoint::new(35.0, 15.0)],
/// )
/// .unwrap();
///
/// assert!(track.is_road(25.0, 15.0));
/// assert!(!track.is_road(5.0, 15.0));
/// assert!(!track.is_road(-1.0, 15.0));
/// assert_eq!(track.goal_index(), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct Track {
    columns: usize,
    rows: usize,
    cell_size: f32,
    cells: Vec<bool>,
    checkpoints: Vec<Checkpoint>,
}

impl Track {
    /// Creates a track from a row-major cell grid.
    pub fn new(
        columns: usize,
        rows: usize,
        cell_size: f32,
        cells: Vec<bool>,
        checkpoints: Vec<Checkpoint>,
    ) -> Result<Self, TrackError> {
        if columns == 0 || rows == 0 {
            return Err(TrackError::EmptyRaster);
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(TrackError::InvalidCellSize(cell_size));
        }
        if cells.len() != columns * rows {
            return Err(TrackError::CellCountMismatch {
                expected: columns * rows,
                actual: cells.len(),
            });
        }
        if checkpoints.is_empty() {
            return Err(TrackError::NoCheckpoints);
        }
        Ok(Self {
            columns,
            rows,
            cell_size,
            cells,
            checkpoints,
        })
    }

    /// Creates a track from textual rows where `.` is road and `#` is wall.
    pub fn from_rows<I, S>(
        cell_size: f32,
        rows: I,
        checkpoints: Vec<Checkpoint>,
    ) -> Result<Self, TrackError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = None;
        let mut row_count = 0;
        let mut cells = vec![];
        for (row, line) in rows.into_iter().enumerate() {
            let line = line.as_ref();
            let width = line.chars().count();
            let expected = *columns.get_or_insert(width);
            if width != expected {
                return Err(TrackError::RaggedRow {
                    row,
                    expected,
                    actual: width,
                });
            }
            for (column, glyph) in line.chars().enumerate() {
                let is_road = match glyph {
                    ROAD_GLYPH => true,
                    WALL_GLYPH => false,
                    glyph => return Err(TrackError::UnknownGlyph { row, column, glyph }),
                };
                cells.push(is_road);
            }
            row_count += 1;
        }
        Self::new(
            columns.unwrap_or(0),
            row_count,
            cell_size,
            cells,
            checkpoints,
        )
    }

    /// Builds an elliptical ring road filling a `width × height` area.
    ///
    /// Checkpoints are spread evenly along the middle of the road, starting at
    /// the top of the ring and running clockwise, so a vehicle spawned on the
    /// first checkpoint with heading 0° faces along the road. The last
    /// checkpoint stops one segment short of closing the loop.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn oval(width: usize, height: usize, road_width: f32, checkpoint_count: usize) -> Self {
        const MARGIN: f32 = 10.0;

        let width = width.max(1);
        let height = height.max(1);
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let (outer_a, outer_b) = (cx - MARGIN, cy - MARGIN);
        let (inner_a, inner_b) = (outer_a - road_width, outer_b - road_width);
        let inside = |a: f32, b: f32, dx: f32, dy: f32| {
            a > 0.0 && b > 0.0 && (dx / a).powi(2) + (dy / b).powi(2) <= 1.0
        };

        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height {
            for column in 0..width {
                let dx = column as f32 + 0.5 - cx;
                let dy = row as f32 + 0.5 - cy;
                cells.push(
                    inside(outer_a, outer_b, dx, dy) && !inside(inner_a, inner_b, dx, dy),
                );
            }
        }

        let checkpoint_count = checkpoint_count.max(1);
        let (mid_a, mid_b) = (outer_a - road_width / 2.0, outer_b - road_width / 2.0);
        let checkpoints = (0..checkpoint_count)
            .map(|i| {
                let theta = -std::f32::consts::FRAC_PI_2
                    + std::f32::consts::TAU * i as f32 / checkpoint_count as f32;
                Checkpoint::new(cx + mid_a * theta.cos(), cy + mid_b * theta.sin())
            })
            .collect();

        Self {
            columns: width,
            rows: height,
            cell_size: 1.0,
            cells,
            checkpoints,
        }
    }

    /// Width of the track in world units.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_size
    }

    /// Height of the track in world units.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.cell_size
    }

    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Fraction of cells that are road.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn road_ratio(&self) -> f32 {
        let road = self.cells.iter().filter(|c| **c).count();
        road as f32 / self.cells.len() as f32
    }
}

impl TrackSurface for Track {
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn is_road(&self, x: f32, y: f32) -> bool {
        // also rejects NaN
        if !(x >= 0.0 && y >= 0.0) {
            return false;
        }
        let column = (x / self.cell_size).floor() as usize;
        let row = (y / self.cell_size).floor() as usize;
        if column >= self.columns || row >= self.rows {
            return false;
        }
        self.cells[row * self.columns + column]
    }

    fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> Track {
        Track::from_rows(
            2.0,
            ["######", "#....#", "#....#", "######"],
            vec![Checkpoint::new(3.0, 3.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_is_road_scales_by_cell_size() {
        let track = corridor();
        assert!(track.is_road(2.0, 2.0));
        assert!(track.is_road(9.9, 5.9));
        assert!(!track.is_road(9.9, 7.9));
        assert!(!track.is_road(1.9, 2.0));
        assert!(!track.is_road(10.0, 2.0));
        assert_eq!(track.width(), 12.0);
        assert_eq!(track.height(), 8.0);
    }

    #[test]
    fn test_out_of_bounds_is_wall() {
        let track = corridor();
        assert!(!track.is_road(-0.1, 3.0));
        assert!(!track.is_road(3.0, -0.1));
        assert!(!track.is_road(100.0, 3.0));
        assert!(!track.is_road(3.0, 100.0));
        assert!(!track.is_road(f32::NAN, 3.0));
    }

    #[test]
    fn test_from_rows_rejects_malformed_raster() {
        let cp = vec![Checkpoint::new(0.0, 0.0)];
        assert_eq!(
            Track::from_rows(1.0, ["...", ".."], cp.clone()).unwrap_err(),
            TrackError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(
            Track::from_rows(1.0, [".x."], cp.clone()).unwrap_err(),
            TrackError::UnknownGlyph {
                row: 0,
                column: 1,
                glyph: 'x'
            }
        );
        assert_eq!(
            Track::from_rows(1.0, Vec::<String>::new(), cp.clone()).unwrap_err(),
            TrackError::EmptyRaster
        );
        assert_eq!(
            Track::from_rows(0.0, ["..."], cp).unwrap_err(),
            TrackError::InvalidCellSize(0.0)
        );
        assert_eq!(
            Track::from_rows(1.0, ["..."], vec![]).unwrap_err(),
            TrackError::NoCheckpoints
        );
    }

    #[test]
    fn test_oval_checkpoints_lie_on_road() {
        let track = Track::oval(960, 540, 80.0, 12);
        assert_eq!(track.checkpoints().len(), 12);
        assert_eq!(track.goal_index(), Some(11));
        for cp in track.checkpoints() {
            assert!(track.is_road(cp.x, cp.y), "{cp:?} should be on the road");
        }
        // center of the ring is wall
        assert!(!track.is_road(480.0, 270.0));
        let ratio = track.road_ratio();
        assert!(ratio > 0.1 && ratio < 0.6, "road ratio {ratio}");
    }

    #[test]
    fn test_oval_starts_at_top_heading_right() {
        let track = Track::oval(960, 540, 80.0, 8);
        let first = track.checkpoints()[0];
        let second = track.checkpoints()[1];
        assert!((first.x - 480.0).abs() < 1e-3);
        assert!(first.y < 270.0);
        assert!(second.x > first.x);
        assert!(second.y > first.y);
    }
}
