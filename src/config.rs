//! Run configuration.
//!
//! A [`Config`] is parsed once from a JSON file at process start and never
//! mutated. The dataset and network identifiers are closed enumerations,
//! resolved while the file is parsed: an unrecognized identifier fails the
//! load with a typed error instead of surviving until dispatch time.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{Error, Result};

/// Recognized dataset identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DatasetKind {
    /// CIFAR-10, 10 classes at 32x32
    Cifar10,
    /// CIFAR-100, 100 fine-grained classes at 32x32
    Cifar100,
    /// CIFAR-10 upscaled to 128x128
    Cifar10_128,
}

impl DatasetKind {
    /// All recognized identifiers, for diagnostics
    pub const IDENTIFIERS: [&'static str; 3] = ["CIFAR10", "CIFAR100", "CIFAR10_128"];

    /// The configuration-file identifier for this dataset
    pub fn identifier(self) -> &'static str {
        match self {
            DatasetKind::Cifar10 => "CIFAR10",
            DatasetKind::Cifar100 => "CIFAR100",
            DatasetKind::Cifar10_128 => "CIFAR10_128",
        }
    }
}

impl TryFrom<String> for DatasetKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "CIFAR10" => Ok(DatasetKind::Cifar10),
            "CIFAR100" => Ok(DatasetKind::Cifar100),
            "CIFAR10_128" => Ok(DatasetKind::Cifar10_128),
            other => Err(Error::Config(format!(
                "Invalid dataset identifier {:?} (expected one of: {})",
                other,
                Self::IDENTIFIERS.join(", ")
            ))),
        }
    }
}

impl From<DatasetKind> for String {
    fn from(kind: DatasetKind) -> Self {
        kind.identifier().to_string()
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Recognized network identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkKind {
    ResNet50,
}

impl NetworkKind {
    /// All recognized identifiers, for diagnostics
    pub const IDENTIFIERS: [&'static str; 1] = ["ResNet50"];

    /// The configuration-file identifier for this network
    pub fn identifier(self) -> &'static str {
        match self {
            NetworkKind::ResNet50 => "ResNet50",
        }
    }
}

impl TryFrom<String> for NetworkKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "ResNet50" => Ok(NetworkKind::ResNet50),
            other => Err(Error::Config(format!(
                "Invalid network identifier {:?} (expected one of: {})",
                other,
                Self::IDENTIFIERS.join(", ")
            ))),
        }
    }
}

impl From<NetworkKind> for String {
    fn from(kind: NetworkKind) -> Self {
        kind.identifier().to_string()
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Immutable snapshot of run parameters, parsed once at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Dataset selection
    pub dataset: DatasetKind,

    /// Network selection
    pub network: NetworkKind,

    /// Batch size for training and evaluation
    pub batch_size: usize,

    /// Validation split carved from the training set: a fraction if < 1.0,
    /// an absolute sample count otherwise
    pub validation_size: f64,

    /// Whether to augment training batches (flip + padded random crop)
    pub augment: bool,

    /// Random seed for the backend and all data-ordering randomness
    pub seed: u64,

    /// Directory holding checkpoint files
    pub weights_dir: String,

    /// Checkpoint stem; the full path is `{weights_dir}/{weights_path}.ckpt`
    pub weights_path: String,

    /// Whether the network is built with its classifier head
    pub include_top: bool,

    /// Optional initial weights blob loaded at network construction
    #[serde(default)]
    pub weights: Option<String>,

    /// Directory holding the extracted CIFAR binary archives
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Training epochs (train binary only)
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Learning rate (train binary only)
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_epochs() -> usize {
    30
}

fn default_learning_rate() -> f64 {
    1e-4
}

impl Config {
    /// Parse a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_json(&content)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than 0".to_string()));
        }

        if self.validation_size < 0.0 {
            return Err(Error::Config("validation_size must not be negative".to_string()));
        }

        if self.learning_rate <= 0.0 {
            return Err(Error::Config("learning_rate must be positive".to_string()));
        }

        Ok(())
    }

    /// Checkpoint path derived from the configured directory and stem.
    pub fn checkpoint_path(&self) -> String {
        format!("{}/{}.ckpt", self.weights_dir, self.weights_path)
    }
}
