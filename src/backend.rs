//! Backend selection and global random-state initialization.
//!
//! The harness runs on the WGPU backend when the `wgpu` feature is enabled
//! and falls back to the NdArray CPU backend otherwise. Which backend is in
//! use is informational only; it never affects control flow.

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::NdArray;

/// The autodiff backend used for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device for the active backend
pub fn default_device() -> <DefaultBackend as Backend>::Device {
    #[cfg(feature = "wgpu")]
    {
        burn::backend::wgpu::WgpuDevice::default()
    }

    #[cfg(not(feature = "wgpu"))]
    {
        burn::backend::ndarray::NdArrayDevice::default()
    }
}

/// Human-readable name of the active backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "WGPU (GPU)"
    }

    #[cfg(not(feature = "wgpu"))]
    {
        "NdArray (CPU)"
    }
}

/// Whether the active backend targets a GPU
pub fn gpu_available() -> bool {
    cfg!(feature = "wgpu")
}

/// Seed the backend's global random state.
///
/// Called exactly once by each binary before any tensor work. Data-ordering
/// randomness (shuffles, splits) uses explicitly seeded `ChaCha8Rng` values
/// instead of this global state.
pub fn seed_all(seed: u64) {
    DefaultBackend::seed(seed);
}
