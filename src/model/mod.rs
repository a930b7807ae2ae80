//! Network construction.
//!
//! The configured [`NetworkKind`](crate::config::NetworkKind) selects the
//! architecture; construction is parameterised by `(include_top, weights,
//! num_classes)`. The [`Classifier`] trait is the seam between the
//! evaluation adapter and concrete networks.

pub mod resnet;

use burn::prelude::*;
use tracing::info;

use crate::checkpoint;
use crate::config::{Config, NetworkKind};
use crate::utils::error::Result;

pub use resnet::{ResNet, ResNetConfig};

/// A network the evaluation adapter can drive: images in, logits (or
/// features) out.
pub trait Classifier<B: Backend> {
    /// Forward pass: `[batch, 3, H, W]` images to `[batch, out]` outputs
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Number of target classes
    fn num_classes(&self) -> usize;
}

/// Build the configured network on the given device.
///
/// When the configuration names an initial `weights` blob, it is loaded into
/// the freshly initialized network before returning.
pub fn build<B: Backend>(config: &Config, num_classes: usize, device: &B::Device) -> Result<ResNet<B>> {
    let model = match config.network {
        NetworkKind::ResNet50 => {
            info!(
                "Building ResNet50 (num_classes={}, include_top={})",
                num_classes, config.include_top
            );
            ResNetConfig::new()
                .with_num_classes(num_classes)
                .with_include_top(config.include_top)
                .init(device)
        }
    };

    match &config.weights {
        Some(weights_path) => {
            info!("Loading initial weights from {}", weights_path);
            checkpoint::load(model, weights_path, device)
        }
        None => Ok(model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};
    use crate::config::Config;

    fn test_config(include_top: bool) -> Config {
        Config::from_json(&format!(
            r#"{{
                "dataset": "CIFAR10",
                "network": "ResNet50",
                "batch_size": 2,
                "validation_size": 0.1,
                "augment": false,
                "seed": 1,
                "weights_dir": "out",
                "weights_path": "w",
                "include_top": {include_top}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_build_with_top_outputs_class_logits() {
        let device = default_device();
        let model = build::<DefaultBackend>(&test_config(true), 10, &device).unwrap();

        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [1, 10]);
    }

    #[test]
    fn test_build_without_top_outputs_features() {
        let device = default_device();
        let model = build::<DefaultBackend>(&test_config(false), 10, &device).unwrap();

        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [1, resnet::FEATURE_DIM]);
    }
}
