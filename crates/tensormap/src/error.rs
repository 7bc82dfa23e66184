//! Error types for tensor map operations.

use thiserror::Error;

/// Error type for label, block and tensor map operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorMapError {
    /// A requested key, sample or property variable does not exist.
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// Blocks or arrays have incompatible structure for the operation.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A fully specified selection matched no block.
    #[error("no block matches {0}")]
    NotFound(String),

    /// The same entry appears twice in a label set.
    #[error("duplicate entry {entry:?} in labels")]
    DuplicateKey { entry: Vec<i32> },

    /// The same variable name appears twice in a label set.
    #[error("duplicate variable name '{name}' in labels")]
    DuplicateVariable { name: String },

    /// Label names or entries are malformed.
    #[error("invalid labels: {0}")]
    InvalidLabels(String),

    /// Gradient metadata does not refer to its block correctly.
    #[error("invalid gradient: {0}")]
    InvalidGradient(String),

    /// A selection expected to find one block found several.
    #[error("selection matched {count} blocks, expected exactly one")]
    AmbiguousSelection { count: usize },
}

/// Result type for tensor map operations.
pub type Result<T> = std::result::Result<T, TensorMapError>;

pub(crate) fn shape_mismatch(msg: impl Into<String>) -> TensorMapError {
    TensorMapError::ShapeMismatch(msg.into())
}
