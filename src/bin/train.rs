//! Supervised training entry point.
//!
//! Takes the same JSON run configuration as the evaluation driver and fits
//! the configured network, saving the best checkpoint to
//! `{weights_dir}/{weights_path}.ckpt` for later evaluation.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::info;

use cifar_harness::backend::{backend_name, default_device, seed_all, TrainingBackend};
use cifar_harness::training::run_training;
use cifar_harness::utils::logging::{init_logging, LogConfig};
use cifar_harness::Config;

/// Train a CIFAR classifier from a JSON run configuration
#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(version)]
#[command(about = "Configuration-driven CIFAR classification training", long_about = None)]
struct Cli {
    /// Path to the JSON run configuration
    #[arg(long = "config_path")]
    config_path: String,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    let config = Config::from_file(&cli.config_path)?;
    info!("Loaded configuration from {}", cli.config_path);

    seed_all(config.seed);
    println!("{} {}", "Backend:".cyan(), backend_name());

    let device = default_device();
    run_training::<TrainingBackend>(&config, &device)?;

    Ok(())
}
