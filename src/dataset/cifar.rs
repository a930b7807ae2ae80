//! CIFAR binary-format loaders.
//!
//! Reads the standard extracted archives:
//!
//! - CIFAR-10 (`cifar-10-batches-bin/`): each record is 1 label byte followed
//!   by 3072 pixel bytes in CHW order (red plane, green plane, blue plane).
//! - CIFAR-100 (`cifar-100-binary/`): each record carries a coarse label byte
//!   then a fine label byte, followed by the same 3072 pixel bytes. Only the
//!   fine label is used.
//!
//! Pixels are normalized to `[0, 1]` floats at load time. The CIFAR10_128
//! variant upscales each image to 128x128 with bilinear filtering.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;
use image::imageops::FilterType;
use image::RgbImage;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::error::{Error, Result};
use crate::CIFAR_IMAGE_SIZE;

/// Pixel bytes per CIFAR record (3 x 32 x 32)
const PIXELS_PER_RECORD: usize = 3 * CIFAR_IMAGE_SIZE * CIFAR_IMAGE_SIZE;

/// CIFAR-10 record length: label byte + pixels
const CIFAR10_RECORD_LEN: usize = 1 + PIXELS_PER_RECORD;

/// CIFAR-100 record length: coarse byte + fine byte + pixels
const CIFAR100_RECORD_LEN: usize = 2 + PIXELS_PER_RECORD;

/// A single sample ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CifarItem {
    /// Image data as a flattened CHW float array in `[0, 1]`
    pub image: Vec<f32>,
    /// Class label index
    pub label: usize,
}

impl CifarItem {
    pub fn new(image: Vec<f32>, label: usize) -> Self {
        Self { image, label }
    }
}

/// An in-memory split implementing Burn's `Dataset` trait.
#[derive(Debug, Clone)]
pub struct CifarSplit {
    items: Vec<CifarItem>,
}

impl CifarSplit {
    pub fn new(items: Vec<CifarItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CifarItem] {
        &self.items
    }

    /// Samples per class, indexed by label
    pub fn class_distribution(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for item in &self.items {
            if item.label < num_classes {
                counts[item.label] += 1;
            }
        }
        counts
    }
}

impl Dataset<CifarItem> for CifarSplit {
    fn get(&self, index: usize) -> Option<CifarItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// The complete output of a dataset construction: three splits plus the
/// class-name mapping.
#[derive(Debug, Clone)]
pub struct CifarBundle {
    pub train: CifarSplit,
    pub validation: CifarSplit,
    pub test: CifarSplit,
    /// Class names in label order
    pub class_names: Vec<String>,
    /// Reverse mapping from class name to label index
    pub class_to_idx: HashMap<String, usize>,
    pub num_classes: usize,
    /// Image edge length of every item in the bundle
    pub image_size: usize,
}

/// Load CIFAR-10 train and test sets from `{data_dir}/cifar-10-batches-bin`.
///
/// `image_size` above 32 upscales every image at load time.
pub fn load_cifar10(data_dir: &str, image_size: usize) -> Result<(Vec<CifarItem>, Vec<CifarItem>)> {
    let root = Path::new(data_dir).join("cifar-10-batches-bin");
    if !root.exists() {
        return Err(Error::Dataset(format!(
            "CIFAR-10 archive not found at {:?} (expected the extracted cifar-10-batches-bin directory)",
            root
        )));
    }

    let mut train = Vec::new();
    for batch in 1..=5 {
        let path = root.join(format!("data_batch_{}.bin", batch));
        train.extend(read_batch_file(&path, CIFAR10_RECORD_LEN, 1, image_size)?);
    }

    let test = read_batch_file(&root.join("test_batch.bin"), CIFAR10_RECORD_LEN, 1, image_size)?;

    debug!("CIFAR-10: {} train, {} test records", train.len(), test.len());
    Ok((train, test))
}

/// Load CIFAR-100 train and test sets from `{data_dir}/cifar-100-binary`.
pub fn load_cifar100(data_dir: &str) -> Result<(Vec<CifarItem>, Vec<CifarItem>)> {
    let root = Path::new(data_dir).join("cifar-100-binary");
    if !root.exists() {
        return Err(Error::Dataset(format!(
            "CIFAR-100 archive not found at {:?} (expected the extracted cifar-100-binary directory)",
            root
        )));
    }

    let train = read_batch_file(&root.join("train.bin"), CIFAR100_RECORD_LEN, 2, CIFAR_IMAGE_SIZE)?;
    let test = read_batch_file(&root.join("test.bin"), CIFAR100_RECORD_LEN, 2, CIFAR_IMAGE_SIZE)?;

    debug!("CIFAR-100: {} train, {} test records", train.len(), test.len());
    Ok((train, test))
}

/// Read one binary batch file into items.
///
/// `label_bytes` is the per-record header length; the label used is the LAST
/// header byte (the fine label for CIFAR-100).
fn read_batch_file(
    path: &PathBuf,
    record_len: usize,
    label_bytes: usize,
    image_size: usize,
) -> Result<Vec<CifarItem>> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Dataset(format!("Failed to read batch file {:?}: {}", path, e)))?;

    if bytes.is_empty() || bytes.len() % record_len != 0 {
        return Err(Error::Dataset(format!(
            "Batch file {:?} has {} bytes, not a multiple of the {}-byte record length",
            path,
            bytes.len(),
            record_len
        )));
    }

    let mut items = Vec::with_capacity(bytes.len() / record_len);
    for record in bytes.chunks_exact(record_len) {
        let label = record[label_bytes - 1] as usize;
        let pixels = &record[label_bytes..];
        items.push(CifarItem::new(decode_pixels(pixels, image_size), label));
    }

    Ok(items)
}

/// Decode 3072 CHW pixel bytes into normalized CHW floats, upscaling from
/// 32x32 when `target_size` is larger.
fn decode_pixels(pixels: &[u8], target_size: usize) -> Vec<f32> {
    if target_size == CIFAR_IMAGE_SIZE {
        return pixels.iter().map(|&p| p as f32 / 255.0).collect();
    }

    // Repack CHW planes into an interleaved RGB image for the resize
    let side = CIFAR_IMAGE_SIZE;
    let plane = side * side;
    let mut rgb = RgbImage::new(side as u32, side as u32);
    for y in 0..side {
        for x in 0..side {
            let offset = y * side + x;
            rgb.put_pixel(
                x as u32,
                y as u32,
                image::Rgb([pixels[offset], pixels[plane + offset], pixels[2 * plane + offset]]),
            );
        }
    }

    let resized = image::DynamicImage::ImageRgb8(rgb)
        .resize_exact(target_size as u32, target_size as u32, FilterType::Triangle)
        .to_rgb8();

    // Back to CHW floats
    let target_plane = target_size * target_size;
    let mut out = vec![0.0f32; 3 * target_plane];
    for y in 0..target_size {
        for x in 0..target_size {
            let pixel = resized.get_pixel(x as u32, y as u32);
            let offset = y * target_size + x;
            out[offset] = pixel[0] as f32 / 255.0;
            out[target_plane + offset] = pixel[1] as f32 / 255.0;
            out[2 * target_plane + offset] = pixel[2] as f32 / 255.0;
        }
    }
    out
}

/// Carve the validation split from the training items.
///
/// `validation_size` is a fraction of the training set when below 1.0 and an
/// absolute sample count otherwise. The carve follows a seeded shuffle, so a
/// fixed seed reproduces the same split.
pub fn split_validation(
    mut items: Vec<CifarItem>,
    validation_size: f64,
    seed: u64,
) -> (Vec<CifarItem>, Vec<CifarItem>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let n_validation = if validation_size < 1.0 {
        (items.len() as f64 * validation_size).round() as usize
    } else {
        validation_size as usize
    }
    .min(items.len());

    let train = items.split_off(n_validation);
    (train, items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Write a synthetic CIFAR-10 batch file with `n` records; record `i`
    /// gets label `i % 10` and constant pixel value `i`.
    fn write_cifar10_batch(path: &Path, n: usize) {
        let mut bytes = Vec::with_capacity(n * CIFAR10_RECORD_LEN);
        for i in 0..n {
            bytes.push((i % 10) as u8);
            bytes.extend(std::iter::repeat(i as u8).take(PIXELS_PER_RECORD));
        }
        std::fs::write(path, bytes).unwrap();
    }

    fn write_cifar100_batch(path: &Path, n: usize) {
        let mut bytes = Vec::with_capacity(n * CIFAR100_RECORD_LEN);
        for i in 0..n {
            bytes.push((i % 20) as u8); // coarse, ignored
            bytes.push((i % 100) as u8); // fine
            bytes.extend(std::iter::repeat(128u8).take(PIXELS_PER_RECORD));
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_load_cifar10_decodes_labels_and_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cifar-10-batches-bin");
        std::fs::create_dir(&root).unwrap();
        for batch in 1..=5 {
            write_cifar10_batch(&root.join(format!("data_batch_{}.bin", batch)), 4);
        }
        write_cifar10_batch(&root.join("test_batch.bin"), 3);

        let (train, test) =
            load_cifar10(dir.path().to_str().unwrap(), CIFAR_IMAGE_SIZE).unwrap();

        assert_eq!(train.len(), 20);
        assert_eq!(test.len(), 3);
        assert_eq!(train[0].label, 0);
        assert_eq!(train[1].label, 1);
        assert_eq!(train[0].image.len(), PIXELS_PER_RECORD);
        // record 1 has constant pixel value 1
        assert!((train[1].image[0] - 1.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_cifar10_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cifar-10-batches-bin");
        std::fs::create_dir(&root).unwrap();
        for batch in 1..=5 {
            write_cifar10_batch(&root.join(format!("data_batch_{}.bin", batch)), 1);
        }
        write_cifar10_batch(&root.join("test_batch.bin"), 1);

        let (train, _) = load_cifar10(dir.path().to_str().unwrap(), 128).unwrap();

        assert_eq!(train[0].image.len(), 3 * 128 * 128);
        // constant image stays constant through bilinear resampling
        assert!(train[0].image.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn test_load_cifar100_uses_fine_label() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cifar-100-binary");
        std::fs::create_dir(&root).unwrap();
        write_cifar100_batch(&root.join("train.bin"), 5);
        write_cifar100_batch(&root.join("test.bin"), 2);

        let (train, test) = load_cifar100(dir.path().to_str().unwrap()).unwrap();

        assert_eq!(train.len(), 5);
        assert_eq!(test.len(), 2);
        assert_eq!(train[3].label, 3);
        assert!((train[0].image[100] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_cifar10(dir.path().to_str().unwrap(), CIFAR_IMAGE_SIZE).unwrap_err();
        assert!(err.to_string().contains("cifar-10-batches-bin"));
    }

    #[test]
    fn test_truncated_batch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cifar-100-binary");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("train.bin"), vec![0u8; 100]).unwrap();
        std::fs::write(root.join("test.bin"), Vec::<u8>::new()).unwrap();

        let err = load_cifar100(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("record length"));
    }

    fn items(n: usize) -> Vec<CifarItem> {
        (0..n).map(|i| CifarItem::new(vec![0.0; 4], i % 10)).collect()
    }

    #[test]
    fn test_validation_split_fraction() {
        let (train, val) = split_validation(items(100), 0.2, 42);
        assert_eq!(val.len(), 20);
        assert_eq!(train.len(), 80);
    }

    #[test]
    fn test_validation_split_absolute_count() {
        let (train, val) = split_validation(items(100), 15.0, 42);
        assert_eq!(val.len(), 15);
        assert_eq!(train.len(), 85);
    }

    #[test]
    fn test_validation_split_is_reproducible() {
        let (_, val1) = split_validation(items(50), 0.3, 7);
        let (_, val2) = split_validation(items(50), 0.3, 7);
        let labels1: Vec<_> = val1.iter().map(|i| i.label).collect();
        let labels2: Vec<_> = val2.iter().map(|i| i.label).collect();
        assert_eq!(labels1, labels2);
    }

    #[test]
    fn test_split_dataset_trait() {
        let split = CifarSplit::new(items(12));
        assert_eq!(split.len(), 12);
        assert!(split.get(11).is_some());
        assert!(split.get(12).is_none());
        assert_eq!(split.class_distribution(10)[2], 1);
    }
}
