//! # CIFAR Harness
//!
//! A thin, configuration-driven harness for image-classification experiments
//! on the CIFAR datasets using the Burn framework.
//!
//! A single JSON configuration file selects a dataset (CIFAR-10, CIFAR-100,
//! or CIFAR-10 upscaled to 128x128), a network (ResNet-50), and the run
//! parameters. The `train` binary fits the network; the main binary loads a
//! checkpoint, runs the test set through an evaluation adapter, prints the
//! accumulated metrics, and renders the confusion matrix as a PNG heatmap.
//!
//! ## Modules
//!
//! - `config`: the run-configuration record parsed from JSON
//! - `dataset`: CIFAR dispatch, binary-format loaders, batching, augmentation
//! - `model`: network dispatch and the ResNet-50 architecture
//! - `eval`: the evaluation adapter coupling network, loss, and accumulators
//! - `training`: the supervised training loop
//! - `checkpoint`: opaque weight blobs at exact on-disk paths
//! - `utils`: logging, error types, metrics, heatmap rendering

pub mod backend;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod eval;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{Config, DatasetKind, NetworkKind};
pub use dataset::{CifarBatch, CifarBatcher, CifarBundle, CifarItem, CifarSplit};
pub use eval::Evaluator;
pub use model::{Classifier, ResNet};
pub use utils::error::{Error, Result};
pub use utils::metrics::{ConfusionMatrix, MetricSet};

/// Native CIFAR image edge length in pixels
pub const CIFAR_IMAGE_SIZE: usize = 32;

/// Edge length of the upscaled CIFAR10_128 variant
pub const CIFAR_UPSCALED_SIZE: usize = 128;

/// Output filename for the rendered confusion matrix
pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.png";

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
