//! Checkpoint I/O.
//!
//! Weights are stored as opaque full-precision record blobs at exact paths,
//! including the `.ckpt` suffix the configuration interpolates. The blob
//! format is owned by Burn's recorder; this module only moves bytes.

use std::path::Path;

use burn::module::Module;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;
use tracing::info;

use crate::utils::error::{Error, Result};

/// Save a module's weights to the exact given path.
///
/// Parent directories are created as needed; an existing file is
/// overwritten.
pub fn save<B: Backend, M: Module<B>>(module: M, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();

    let bytes = recorder
        .record(module.into_record(), ())
        .map_err(|e| Error::Checkpoint(format!("Failed to encode weights: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;

    info!("Saved checkpoint to {:?}", path);
    Ok(())
}

/// Load weights from the exact given path into a freshly initialized module.
///
/// A missing or unreadable file is a typed error; there is no fallback.
pub fn load<B: Backend, M: Module<B>>(
    module: M,
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<M> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        Error::Checkpoint(format!("Failed to read checkpoint {:?}: {}", path, e))
    })?;

    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let record = recorder
        .load(bytes, device)
        .map_err(|e| Error::Checkpoint(format!("Failed to decode checkpoint {:?}: {}", path, e)))?;

    info!("Loaded checkpoint from {:?}", path);
    Ok(module.load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};
    use burn::nn::{Linear, LinearConfig};
    use burn::prelude::*;

    fn small_model(device: &<DefaultBackend as Backend>::Device) -> Linear<DefaultBackend> {
        LinearConfig::new(4, 2).init(device)
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let device = default_device();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models/test_weights.ckpt");

        let model = small_model(&device);
        let input = Tensor::<DefaultBackend, 2>::ones([1, 4], &device);
        let expected = model.forward(input.clone()).into_data().to_vec::<f32>().unwrap();

        save(model, &path).unwrap();
        assert!(path.exists());

        let restored = load(small_model(&device), &path, &device).unwrap();
        let actual = restored.forward(input).into_data().to_vec::<f32>().unwrap();

        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(actual.iter()) {
            assert!((e - a).abs() < 1e-5);
        }
    }

    #[test]
    fn test_load_missing_file_is_a_checkpoint_error() {
        let device = default_device();
        let err = load(small_model(&device), "/nonexistent/w.ckpt", &device).unwrap_err();
        assert!(matches!(err, Error::Checkpoint(_)));
    }

    #[test]
    fn test_exact_path_is_preserved() {
        let device = default_device();
        let dir = tempfile::tempdir().unwrap();
        // suffix must survive untouched, no format extension appended
        let path = dir.path().join("resnet50_cifar10.ckpt");

        save(small_model(&device), &path).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("resnet50_cifar10.mpk").exists());
    }
}
