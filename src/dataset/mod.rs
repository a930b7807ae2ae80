//! CIFAR dataset construction.
//!
//! The configured [`DatasetKind`](crate::config::DatasetKind) selects one of
//! three constructions, all backed by the standard CIFAR binary archives on
//! disk:
//!
//! - `CIFAR10`: 10 classes at 32x32
//! - `CIFAR100`: 100 fine-grained classes at 32x32
//! - `CIFAR10_128`: CIFAR-10 upscaled to 128x128 at load time
//!
//! Each construction yields a [`CifarBundle`] holding train/validation/test
//! splits and the ordered class-name mapping.

pub mod augmentation;
pub mod batcher;
pub mod cifar;

use std::collections::HashMap;

use tracing::info;

use crate::config::{Config, DatasetKind};
use crate::utils::error::Result;
use crate::{CIFAR_IMAGE_SIZE, CIFAR_UPSCALED_SIZE};

pub use augmentation::Augmenter;
pub use batcher::{CifarBatch, CifarBatcher};
pub use cifar::{CifarBundle, CifarItem, CifarSplit};

/// CIFAR-10 class names, in label order
pub const CIFAR10_CLASSES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// CIFAR-100 fine-label class names, in label order
pub const CIFAR100_CLASSES: [&str; 100] = [
    "apple",
    "aquarium_fish",
    "baby",
    "bear",
    "beaver",
    "bed",
    "bee",
    "beetle",
    "bicycle",
    "bottle",
    "bowl",
    "boy",
    "bridge",
    "bus",
    "butterfly",
    "camel",
    "can",
    "castle",
    "caterpillar",
    "cattle",
    "chair",
    "chimpanzee",
    "clock",
    "cloud",
    "cockroach",
    "couch",
    "crab",
    "crocodile",
    "cup",
    "dinosaur",
    "dolphin",
    "elephant",
    "flatfish",
    "forest",
    "fox",
    "girl",
    "hamster",
    "house",
    "kangaroo",
    "keyboard",
    "lamp",
    "lawn_mower",
    "leopard",
    "lion",
    "lizard",
    "lobster",
    "man",
    "maple_tree",
    "motorcycle",
    "mountain",
    "mouse",
    "mushroom",
    "oak_tree",
    "orange",
    "orchid",
    "otter",
    "palm_tree",
    "pear",
    "pickup_truck",
    "pine_tree",
    "plain",
    "plate",
    "poppy",
    "porcupine",
    "possum",
    "rabbit",
    "raccoon",
    "ray",
    "road",
    "rocket",
    "rose",
    "sea",
    "seal",
    "shark",
    "shrew",
    "skunk",
    "skyscraper",
    "snail",
    "snake",
    "spider",
    "squirrel",
    "streetcar",
    "sunflower",
    "sweet_pepper",
    "table",
    "tank",
    "telephone",
    "television",
    "tiger",
    "tractor",
    "train",
    "trout",
    "tulip",
    "turtle",
    "wardrobe",
    "whale",
    "willow_tree",
    "wolf",
    "woman",
    "worm",
];

impl DatasetKind {
    /// Number of target classes for this dataset
    pub fn num_classes(self) -> usize {
        match self {
            DatasetKind::Cifar10 | DatasetKind::Cifar10_128 => 10,
            DatasetKind::Cifar100 => 100,
        }
    }

    /// Image edge length after loading
    pub fn image_size(self) -> usize {
        match self {
            DatasetKind::Cifar10 | DatasetKind::Cifar100 => CIFAR_IMAGE_SIZE,
            DatasetKind::Cifar10_128 => CIFAR_UPSCALED_SIZE,
        }
    }

    /// Class names in label order
    pub fn class_names(self) -> Vec<String> {
        match self {
            DatasetKind::Cifar10 | DatasetKind::Cifar10_128 => {
                CIFAR10_CLASSES.iter().map(|s| s.to_string()).collect()
            }
            DatasetKind::Cifar100 => CIFAR100_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Build the configured dataset: load the CIFAR binaries, carve the
/// validation split from the training set, and assemble the bundle.
pub fn build(config: &Config) -> Result<CifarBundle> {
    let kind = config.dataset;
    info!(
        "Building dataset {} ({} classes at {}x{})",
        kind,
        kind.num_classes(),
        kind.image_size(),
        kind.image_size()
    );

    let (train_items, test_items) = match kind {
        DatasetKind::Cifar10 => cifar::load_cifar10(&config.data_dir, CIFAR_IMAGE_SIZE)?,
        DatasetKind::Cifar10_128 => cifar::load_cifar10(&config.data_dir, CIFAR_UPSCALED_SIZE)?,
        DatasetKind::Cifar100 => cifar::load_cifar100(&config.data_dir)?,
    };

    let (train_items, validation_items) =
        cifar::split_validation(train_items, config.validation_size, config.seed);

    info!(
        "Split sizes: {} train / {} validation / {} test",
        train_items.len(),
        validation_items.len(),
        test_items.len()
    );

    let class_names = kind.class_names();
    let class_to_idx: HashMap<String, usize> = class_names
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), idx))
        .collect();

    Ok(CifarBundle {
        train: CifarSplit::new(train_items),
        validation: CifarSplit::new(validation_items),
        test: CifarSplit::new(test_items),
        class_names,
        class_to_idx,
        num_classes: kind.num_classes(),
        image_size: kind.image_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_counts_per_kind() {
        assert_eq!(DatasetKind::Cifar10.num_classes(), 10);
        assert_eq!(DatasetKind::Cifar100.num_classes(), 100);
        assert_eq!(DatasetKind::Cifar10_128.num_classes(), 10);
    }

    #[test]
    fn test_image_sizes_per_kind() {
        assert_eq!(DatasetKind::Cifar10.image_size(), 32);
        assert_eq!(DatasetKind::Cifar100.image_size(), 32);
        assert_eq!(DatasetKind::Cifar10_128.image_size(), 128);
    }

    #[test]
    fn test_class_name_tables_are_complete() {
        assert_eq!(DatasetKind::Cifar10.class_names().len(), 10);
        assert_eq!(DatasetKind::Cifar100.class_names().len(), 100);
        assert_eq!(DatasetKind::Cifar10.class_names()[0], "airplane");
        assert_eq!(DatasetKind::Cifar100.class_names()[99], "worm");
    }
}
