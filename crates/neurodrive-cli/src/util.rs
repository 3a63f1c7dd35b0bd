use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use neurodrive_engine::Track;
use neurodrive_training::config::TrainingConfig;

use crate::schema::{model::PolicyModel, track::TrackFile};

/// Size of the built-in oval track.
pub const DEFAULT_TRACK_WIDTH: usize = 960;
pub const DEFAULT_TRACK_HEIGHT: usize = 540;
pub const DEFAULT_ROAD_WIDTH: f32 = 80.0;
pub const DEFAULT_CHECKPOINT_COUNT: usize = 12;

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::create(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn create(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize + ?Sized,
    {
        serde_json::to_writer_pretty(&mut *self, value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self)
            .with_context(|| format!("Failed to write newline to {}", self.display_path()))?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Reads a trained policy written by `train --output`.
pub fn read_model_file<P>(path: P) -> anyhow::Result<PolicyModel>
where
    P: AsRef<Path>,
{
    read_json_file("model", path)
}

/// Reads a training configuration, or returns the defaults without a path.
pub fn read_config_file(path: Option<&Path>) -> anyhow::Result<TrainingConfig> {
    match path {
        Some(path) => read_json_file("config", path),
        None => Ok(TrainingConfig::default()),
    }
}

/// Loads a track file, or builds the built-in oval without a path.
pub fn load_track(path: Option<&Path>) -> anyhow::Result<Track> {
    let Some(path) = path else {
        return Ok(Track::oval(
            DEFAULT_TRACK_WIDTH,
            DEFAULT_TRACK_HEIGHT,
            DEFAULT_ROAD_WIDTH,
            DEFAULT_CHECKPOINT_COUNT,
        ));
    };
    let file: TrackFile = read_json_file("track", path)?;
    file.to_track()
        .with_context(|| format!("Invalid track file: {}", path.display()))
}
