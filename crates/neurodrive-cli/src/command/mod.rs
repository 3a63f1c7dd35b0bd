use clap::{Parser, Subcommand};

use self::{evaluate::EvaluateArg, show_track::ShowTrackArg, train::TrainArg};

mod evaluate;
mod show_track;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve driving policies with the genetic algorithm
    Train(#[clap(flatten)] TrainArg),
    /// Drive a trained policy once and report its run
    Evaluate(#[clap(flatten)] EvaluateArg),
    /// Print a track as text
    ShowTrack(#[clap(flatten)] ShowTrackArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Evaluate(arg) => evaluate::run(&arg)?,
        Mode::ShowTrack(arg) => show_track::run(&arg)?,
    }
    Ok(())
}
