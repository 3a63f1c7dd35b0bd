use std::error::Error;

/// Persistence of the best chromosomes between sessions.
///
/// The trainer calls [`load`](ChromosomeStore::load) once when it is built and
/// [`save`](ChromosomeStore::save) once per generation with the elites, never
/// while a generation is being simulated.
pub trait ChromosomeStore {
    fn save(&mut self, chromosomes: &[Vec<f32>]) -> Result<(), StoreError>;

    /// Returns the stored chromosomes, or nothing if none were ever saved.
    fn load(&mut self) -> Result<Vec<Vec<f32>>, StoreError>;
}

/// Failure of a [`ChromosomeStore`] backend.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("chromosome store failed")]
pub struct StoreError(#[error(source)] Box<dyn Error + Send + Sync>);

impl StoreError {
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self(error.into())
    }
}

/// Keeps chromosomes in memory; used when nothing needs to outlive the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    chromosomes: Vec<Vec<f32>>,
    save_count: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `chromosomes`.
    #[must_use]
    pub fn with_chromosomes(chromosomes: Vec<Vec<f32>>) -> Self {
        Self {
            chromosomes,
            save_count: 0,
        }
    }

    #[must_use]
    pub fn chromosomes(&self) -> &[Vec<f32>] {
        &self.chromosomes
    }

    /// Number of times [`save`](ChromosomeStore::save) was called.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl ChromosomeStore for MemoryStore {
    fn save(&mut self, chromosomes: &[Vec<f32>]) -> Result<(), StoreError> {
        self.chromosomes = chromosomes.to_vec();
        self.save_count += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(self.chromosomes.clone())
    }
}

impl<S> ChromosomeStore for &mut S
where
    S: ChromosomeStore + ?Sized,
{
    fn save(&mut self, chromosomes: &[Vec<f32>]) -> Result<(), StoreError> {
        (**self).save(chromosomes)
    }

    fn load(&mut self) -> Result<Vec<Vec<f32>>, StoreError> {
        (**self).load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());
        store.save(&[vec![0.5, -0.5]]).unwrap();
        assert_eq!(store.load().unwrap(), vec![vec![0.5, -0.5]]);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_store_error_keeps_source() {
        let err = StoreError::new("disk full");
        assert_eq!(err.to_string(), "chromosome store failed");
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }
}
