use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write as _},
    path::PathBuf,
};

use anyhow::Context as _;
use neurodrive_training::store::{ChromosomeStore, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
struct StoredChromosomes {
    chromosomes: Vec<Vec<f32>>,
}

/// Keeps the elites in a JSON file of the form `{"chromosomes": [[...], ...]}`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> anyhow::Result<Vec<Vec<f32>>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to open {}", self.path.display()));
            }
        };
        let stored: StoredChromosomes = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(stored.chromosomes)
    }

    fn write(&self, chromosomes: &[Vec<f32>]) -> anyhow::Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        let stored = StoredChromosomes {
            chromosomes: chromosomes.to_vec(),
        };
        serde_json::to_writer(&mut writer, &stored)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        Ok(())
    }
}

impl ChromosomeStore for JsonFileStore {
    fn save(&mut self, chromosomes: &[Vec<f32>]) -> Result<(), StoreError> {
        self.write(chromosomes).map_err(StoreError::new)
    }

    fn load(&mut self) -> Result<Vec<Vec<f32>>, StoreError> {
        self.read().map_err(StoreError::new)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("chromosomes.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chromosomes.json");
        let mut store = JsonFileStore::new(path.clone());
        let chromosomes = vec![vec![0.25, -0.5], vec![1.0, 0.0]];
        store.save(&chromosomes).unwrap();
        assert_eq!(store.load().unwrap(), chromosomes);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with(r#"{"chromosomes":"#));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chromosomes.json");
        fs::write(&path, "not json").unwrap();
        let mut store = JsonFileStore::new(path);
        assert!(store.load().is_err());
    }
}
