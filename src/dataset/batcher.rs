//! Batching for CIFAR items.
//!
//! Collates loaded items into `[N, 3, H, W]` float tensors with per-channel
//! normalization and `[N]` integer targets.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use super::cifar::CifarItem;
use crate::config::DatasetKind;

/// CIFAR-10 per-channel mean / std over the training set
pub const CIFAR10_MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];
pub const CIFAR10_STD: [f32; 3] = [0.2470, 0.2435, 0.2616];

/// CIFAR-100 per-channel mean / std over the training set
pub const CIFAR100_MEAN: [f32; 3] = [0.5071, 0.4865, 0.4409];
pub const CIFAR100_STD: [f32; 3] = [0.2673, 0.2564, 0.2762];

/// A batch of CIFAR images ready for the network
#[derive(Clone, Debug)]
pub struct CifarBatch<B: Backend> {
    /// Images with shape `[batch_size, 3, height, width]`, normalized
    pub images: Tensor<B, 4>,
    /// Labels with shape `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher collating [`CifarItem`]s into [`CifarBatch`]es
#[derive(Clone, Debug)]
pub struct CifarBatcher {
    image_size: usize,
    mean: [f32; 3],
    std: [f32; 3],
}

impl CifarBatcher {
    /// Batcher with the normalization statistics matching the dataset kind
    pub fn for_kind(kind: DatasetKind) -> Self {
        let (mean, std) = match kind {
            DatasetKind::Cifar10 | DatasetKind::Cifar10_128 => (CIFAR10_MEAN, CIFAR10_STD),
            DatasetKind::Cifar100 => (CIFAR100_MEAN, CIFAR100_STD),
        };
        Self {
            image_size: kind.image_size(),
            mean,
            std,
        }
    }

    /// Batcher with explicit statistics, for tests and custom data
    pub fn new(image_size: usize, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self {
            image_size,
            mean,
            std,
        }
    }
}

impl<B: Backend> Batcher<B, CifarItem, CifarBatch<B>> for CifarBatcher {
    fn batch(&self, items: Vec<CifarItem>, device: &B::Device) -> CifarBatch<B> {
        let batch_size = items.len();
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 3, height, width]),
            device,
        );

        // Per-channel normalization: (x - mean) / std
        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(self.mean.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(self.std.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let images = (images - mean) / std;

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        CifarBatch { images, targets }
    }
}
