//! Error types for tensor map persistence.

use thiserror::Error;

/// Result type for save/load operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Errors that can occur while saving or loading a tensor map.
#[derive(Error, Debug)]
pub enum IoError {
    /// Underlying file error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failed, including validation of the decoded data
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The data does not start with the tensor map magic bytes
    #[error("invalid magic bytes")]
    InvalidMagic,

    /// The data was written by an unsupported format version
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    /// The data holds a different scalar type than requested
    #[error("stored scalar type is {stored}, requested {requested}")]
    ScalarMismatch {
        stored: &'static str,
        requested: &'static str,
    },
}
