//! Error types for the harness.

use thiserror::Error;

/// Main error type for the harness.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (invalid identifiers, malformed values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset error (missing files, malformed records)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Model error
    #[error("Model error: {0}")]
    Model(String),

    /// Checkpoint error (missing or unreadable weight blobs)
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

/// Specialized Result type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
