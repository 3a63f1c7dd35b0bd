use std::{path::PathBuf, thread, time::Duration};

use anyhow::Context as _;
use chrono::Utc;
use neurodrive_training::{
    config::TrainingConfig,
    telemetry::TracingSink,
    trainer::{Trainer, TrainingStatus},
};

use crate::{
    schema::model::PolicyModel,
    store::JsonFileStore,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Training configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Track file (JSON); the built-in oval is used if omitted
    #[arg(long)]
    track: Option<PathBuf>,
    /// File keeping the best chromosomes between sessions
    #[arg(long, default_value = "chromosomes.json")]
    store: PathBuf,
    /// Output file path for the trained model
    #[arg(long)]
    output: Option<PathBuf>,
    /// Name recorded in the trained model
    #[arg(long, default_value = "neurodrive")]
    name: String,
    /// Trained model placed into the first population slot
    #[arg(long)]
    seed_model: Option<PathBuf>,
    /// Maximum number of generation iterations
    #[arg(long)]
    generations: Option<usize>,
    /// Number of vehicles per generation
    #[arg(long)]
    population: Option<usize>,
    /// Number of elites kept unchanged
    #[arg(long)]
    keep: Option<usize>,
    /// Base per-gene mutation probability
    #[arg(long)]
    mutation_rate: Option<f32>,
    /// Never switch to hypermutation
    #[arg(long)]
    no_hypermutation: bool,
    /// Random seed for a reproducible session
    #[arg(long)]
    seed: Option<u64>,
    /// Stop training after this many seconds
    #[arg(long)]
    time_limit: Option<u64>,
}

impl TrainArg {
    fn apply_overrides(&self, config: &mut TrainingConfig) {
        if let Some(generations) = self.generations {
            config.max_generation_iterations = generations;
        }
        if let Some(population) = self.population {
            config.population_count = population;
        }
        if let Some(keep) = self.keep {
            config.keep_count = keep;
        }
        if let Some(rate) = self.mutation_rate {
            config.mutation_rate = rate;
        }
        if self.no_hypermutation {
            config.hypermutation_enabled = false;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let mut config = util::read_config_file(arg.config.as_deref())?;
    arg.apply_overrides(&mut config);
    config
        .validate()
        .context("Invalid training configuration")?;

    let track = util::load_track(arg.track.as_deref())?;
    let store = JsonFileStore::new(arg.store.clone());
    let mut trainer = Trainer::new(config, track, Box::new(store), Box::new(TracingSink))
        .context("Failed to set up training")?;

    if let Some(path) = &arg.seed_model {
        let model = util::read_model_file(path)?;
        trainer
            .seed_policy(model.to_seed())
            .with_context(|| format!("Model does not fit the policy: {}", path.display()))?;
        tracing::info!(model = %model.name, "seeded first slot from model");
    }

    if let Some(seconds) = arg.time_limit {
        let cancel = trainer.cancellation_token();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            tracing::warn!(seconds, "time limit reached, stopping training");
            cancel.cancel();
        });
    }

    let status = trainer.train().context("Training failed")?;
    if status == TrainingStatus::Cancelled {
        tracing::warn!(round = trainer.round(), "training cancelled");
    }

    let history = trainer.history();
    let Some(last) = history.last() else {
        tracing::warn!("no generation completed, nothing to save");
        return Ok(());
    };
    let model = PolicyModel {
        name: arg.name.clone(),
        trained_at: Utc::now(),
        generations: history.len(),
        final_fitness: last.best_fitness,
        dimensions: last.best.dimensions.clone(),
        chromosome: last.best.chromosome.clone(),
        fitness_history: history.iter().map(|r| r.best_fitness).collect(),
    };
    Output::save_json(&model, arg.output.clone())?;

    tracing::info!(
        name = %model.name,
        generations = model.generations,
        final_fitness = model.final_fitness,
        genes = model.chromosome.len(),
        "model saved to {}",
        arg.output
            .as_ref()
            .map_or_else(|| "stdout".to_owned(), |p| p.display().to_string()),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[clap(flatten)]
        arg: TrainArg,
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "neurodrive",
            "--generations",
            "30",
            "--population",
            "20",
            "--keep",
            "4",
            "--no-hypermutation",
            "--seed",
            "42",
        ]);
        let mut config = TrainingConfig::default();
        cli.arg.apply_overrides(&mut config);
        assert_eq!(config.max_generation_iterations, 30);
        assert_eq!(config.population_count, 20);
        assert_eq!(config.keep_count, 4);
        assert!(!config.hypermutation_enabled);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.mutation_rate, 0.05);
        assert_eq!(cli.arg.store, PathBuf::from("chromosomes.json"));
    }

    #[test]
    fn test_train_writes_model_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("chromosomes.json");
        let output = dir.path().join("model.json");
        let cli = Cli::parse_from([
            "neurodrive",
            "--generations",
            "3",
            "--population",
            "4",
            "--seed",
            "1",
            "--store",
            store.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        run(&cli.arg).unwrap();

        let model = util::read_model_file(&output).unwrap();
        assert_eq!(model.generations, 2);
        assert_eq!(model.dimensions, vec![5, 4, 3]);
        assert_eq!(model.chromosome.len(), 32);
        assert_eq!(model.fitness_history.len(), 2);
        assert_eq!(model.final_fitness, model.fitness_history[1]);
        assert!(store.exists());
    }
}
