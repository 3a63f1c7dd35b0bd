use std::path::PathBuf;

use anyhow::Context as _;
use neurodrive_engine::{RunStats, VehicleState};
use neurodrive_evaluator::{fitness::EvaluateRunStats as _, policy::NeuralPolicy};
use neurodrive_training::trainer;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    /// Trained model file written by `train`
    #[arg(long)]
    model: PathBuf,
    /// Track file (JSON); the built-in oval is used if omitted
    #[arg(long)]
    track: Option<PathBuf>,
    /// Training configuration file (JSON) for vehicle, sensor and fitness settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Random seed for the spawn position
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path for the report
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct EvaluationReport {
    model: String,
    stats: RunStats,
    average_speed: f32,
    fitness: f32,
    shut_off_reason: Option<String>,
    reached_goal: bool,
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let model = util::read_model_file(&arg.model)?;
    let mut config = util::read_config_file(arg.config.as_deref())?;
    config.dimensions.clone_from(&model.dimensions);
    config
        .validate()
        .context("Model does not fit the configuration")?;

    let mut policy = NeuralPolicy::from_chromosome(&model.dimensions, &model.chromosome)
        .with_context(|| format!("Invalid model: {}", arg.model.display()))?;
    let track = util::load_track(arg.track.as_deref())?;
    let mut rng = match arg.seed {
        Some(seed) => Pcg32::seed_from_u64(seed),
        None => Pcg32::from_rng(&mut rand::rng()),
    };

    let vehicle = trainer::evaluate_policy(&track, &mut policy, &config, &mut rng);
    let stats = *vehicle.stats();
    let report = EvaluationReport {
        model: model.name,
        stats,
        average_speed: stats.average_speed(),
        fitness: config.fitness.evaluate_run_stats(&stats),
        shut_off_reason: match vehicle.state() {
            VehicleState::Active => None,
            VehicleState::Inactive(reason) => Some(reason.to_string()),
        },
        reached_goal: vehicle.has_reached_goal(&track),
    };
    tracing::info!(
        fitness = report.fitness,
        checkpoint = stats.last_checkpoint_passed,
        reached_goal = report.reached_goal,
        "evaluation finished"
    );
    Output::save_json(&report, arg.output.clone())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use neurodrive_training::config::TrainingConfig;

    use super::*;
    use crate::schema::model::PolicyModel;

    fn write_model(dir: &std::path::Path, dimensions: Vec<usize>, chromosome: Vec<f32>) -> PathBuf {
        let model = PolicyModel {
            name: "test".to_owned(),
            trained_at: Utc::now(),
            generations: 1,
            final_fitness: 0.0,
            dimensions,
            chromosome,
            fitness_history: vec![],
        };
        let path = dir.join("model.json");
        fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_evaluate_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let genes = neurodrive_evaluator::policy::gene_count(&TrainingConfig::default().dimensions);
        let model = write_model(dir.path(), vec![5, 4, 3], vec![0.0; genes]);
        let output = dir.path().join("report.json");
        let arg = EvaluateArg {
            model,
            track: None,
            config: None,
            seed: Some(3),
            output: Some(output.clone()),
        };
        run(&arg).unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(report["model"], "test");
        assert_eq!(report["reached_goal"], false);
        assert!(report["shut_off_reason"].is_string());
        assert!(report["stats"]["survival_time"].is_number());
    }

    #[test]
    fn test_truncated_model_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path(), vec![5, 4, 3], vec![0.0; 3]);
        let arg = EvaluateArg {
            model,
            track: None,
            config: None,
            seed: Some(3),
            output: Some(dir.path().join("report.json")),
        };
        let err = run(&arg).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid model"));
    }
}
