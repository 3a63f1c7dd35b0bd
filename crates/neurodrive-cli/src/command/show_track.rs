use std::path::PathBuf;

use neurodrive_engine::{Track, TrackSurface as _};

use crate::util;

/// Characters per row when no scale is given.
const DEFAULT_COLUMNS: f32 = 96.0;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ShowTrackArg {
    /// Track file (JSON); the built-in oval is used if omitted
    #[arg(long)]
    track: Option<PathBuf>,
    /// World units per printed character
    #[arg(long)]
    scale: Option<f32>,
}

pub(crate) fn run(arg: &ShowTrackArg) -> anyhow::Result<()> {
    let track = util::load_track(arg.track.as_deref())?;
    let scale = match arg.scale {
        Some(scale) if scale.is_finite() && scale > 0.0 => scale,
        Some(scale) => anyhow::bail!("scale must be positive, got {scale}"),
        None => f32::max(track.cell_size(), track.width() / DEFAULT_COLUMNS),
    };

    print!("{}", render(&track, scale));
    println!();
    println!("Size:        {} x {}", track.width(), track.height());
    println!("Checkpoints: {}", track.checkpoints().len());
    println!("Road ratio:  {:.1}%", track.road_ratio() * 100.0);
    Ok(())
}

/// Draws road as `.` and walls as `#`, sampling the track at the center of
/// every `scale`-sized character cell. Checkpoints are overlaid with their
/// index in base 36.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn render(track: &Track, scale: f32) -> String {
    let columns = (track.width() / scale).ceil() as usize;
    let rows = (track.height() / scale).ceil() as usize;
    let mut grid = (0..rows)
        .map(|row| {
            (0..columns)
                .map(|column| {
                    let x = (column as f32 + 0.5) * scale;
                    let y = (row as f32 + 0.5) * scale;
                    if track.is_road(x, y) { '.' } else { '#' }
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    for (index, checkpoint) in track.checkpoints().iter().enumerate() {
        if !(checkpoint.x >= 0.0 && checkpoint.y >= 0.0) {
            continue;
        }
        let column = (checkpoint.x / scale) as usize;
        let row = (checkpoint.y / scale) as usize;
        let Some(cell) = grid.get_mut(row).and_then(|r| r.get_mut(column)) else {
            continue;
        };
        *cell = char::from_digit((index % 36) as u32, 36).unwrap_or('*');
    }

    let mut out = String::with_capacity(rows * (columns + 1));
    for line in grid {
        out.extend(line);
        out.push('\n');
    }
    out
}
