//! Strata CLI - command-line interface for the Strata training engine
//!
//! Provides a `strata` command for profiling local CSV datasets,
//! validating training configurations, and running a full train → deploy
//! → predict round against the in-process engine.

mod commands;
mod config;
mod loader;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Strata - training-job orchestration for tabular classification
#[derive(Parser, Debug)]
#[command(
    name = "strata",
    author,
    version,
    about = "Strata - dataset profiling, configuration validation, and training orchestration"
)]
struct Args {
    /// Log filter (e.g. info, strata_orchestrator=debug)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Path to a strata.toml with CLI defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Profile a CSV dataset's columns
    Profile {
        /// CSV file to profile
        file: PathBuf,
    },

    /// Validate a training configuration against a CSV dataset
    Validate {
        /// CSV file holding the dataset
        file: PathBuf,

        /// Target column
        #[arg(short, long)]
        target: String,

        /// Feature columns (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,

        /// Holdout share, strictly between 0 and 1
        #[arg(long)]
        test_size: Option<f64>,
    },

    /// Train a classifier and watch the job to completion
    Train {
        /// CSV file holding the dataset
        file: PathBuf,

        /// Target column
        #[arg(short, long)]
        target: String,

        /// Feature columns (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,

        /// Holdout share, strictly between 0 and 1
        #[arg(long)]
        test_size: Option<f64>,

        /// Algorithm (auto, logistic, svm, random_forest, naive_bayes)
        #[arg(long)]
        algorithm: Option<String>,

        /// Deploy the completed model under this name
        #[arg(long)]
        name: Option<String>,

        /// Classify this text with the deployed model afterwards
        #[arg(long)]
        predict: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level)?)
        .init();

    let defaults = config::CliDefaults::load(args.config.as_deref())?;
    match args.command {
        Command::Profile { file } => commands::profile(&file),
        Command::Validate { file, target, features, test_size } => {
            commands::validate(&file, &target, features, test_size, &defaults)
        }
        Command::Train { file, target, features, test_size, algorithm, name, predict } => {
            commands::train(commands::TrainArgs {
                file,
                target,
                features,
                test_size,
                algorithm,
                name,
                predict,
                defaults,
            })
            .await
        }
    }
}
