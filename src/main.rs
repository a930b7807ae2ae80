//! CIFAR evaluation driver.
//!
//! Loads the JSON run configuration, builds the configured dataset and
//! network, restores the checkpoint from
//! `{weights_dir}/{weights_path}.ckpt`, runs the test pass through the
//! evaluation adapter, prints each metric as `<name>: <value>`, and renders
//! the confusion matrix to `confusion_matrix.png`.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::info;

use cifar_harness::backend::{backend_name, default_device, gpu_available, seed_all, DefaultBackend};
use cifar_harness::dataset::CifarBatcher;
use cifar_harness::eval::Evaluator;
use cifar_harness::utils::heatmap::render_confusion_matrix;
use cifar_harness::utils::logging::{init_logging, LogConfig};
use cifar_harness::{checkpoint, dataset, model, Config, CONFUSION_MATRIX_FILE};

/// Evaluate a trained CIFAR classifier against its test set
#[derive(Parser, Debug)]
#[command(name = "cifar_harness")]
#[command(version)]
#[command(about = "Configuration-driven CIFAR classification evaluation", long_about = None)]
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

    if gpu_available() {
        println!("{} {}", "Backend:".cyan(), backend_name());
    } else {
        println!(
            "{} {} {}",
            "Backend:".cyan(),
            backend_name(),
            "(no GPU available, evaluating on CPU)".yellow()
        );
    }

    let device = default_device();

    println!("{}", "Loading dataset...".cyan());
    let bundle = dataset::build(&config)?;
    println!(
        "  {} test samples, {} classes",
        bundle.test.items().len(),
        bundle.num_classes
    );

    println!("{}", "Building model...".cyan());
    let network = model::build::<DefaultBackend>(&config, bundle.num_classes, &device)?;
    let network = checkpoint::load(network, config.checkpoint_path(), &device)?;
    println!("  Restored weights from {}", config.checkpoint_path());

    let batcher = CifarBatcher::for_kind(config.dataset);
    let mut evaluator = Evaluator::new(network, &device);

    println!("{}", "Evaluating...".cyan());
    evaluator.run(&bundle.test, &batcher, config.batch_size, &device)?;
    info!("Evaluated {} samples", evaluator.count());

    println!();
    for (name, value) in evaluator.compute() {
        println!("{}: {}", name, value);
    }
    println!();

    let output = Path::new(CONFUSION_MATRIX_FILE);
    render_confusion_matrix(evaluator.confusion_matrix(), &bundle.class_names, output)?;
    println!(
        "{} {}",
        "Confusion matrix written to".green(),
        CONFUSION_MATRIX_FILE
    );

    Ok(())
}
