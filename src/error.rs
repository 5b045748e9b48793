//! Error types for tensors, kernels, layers and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Errors that can occur while building or running the network.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Two shapes that must agree do not.
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Operation or parameter that detected the mismatch.
        context: String,
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// Tensor has the wrong number of dimensions.
    #[error("{context} requires a {expected}D tensor, got shape {actual:?}")]
    RankMismatch {
        context: String,
        expected: usize,
        actual: Vec<usize>,
    },

    /// Argument outside the accepted domain (zero stride, kernel larger than input, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Network configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("Failed to read configuration {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// ndarray refused a reshape or construction.
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl TransformError {
    pub(crate) fn shape_mismatch(
        context: impl Into<String>,
        expected: &[usize],
        actual: &[usize],
    ) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    pub(crate) fn rank_mismatch(context: impl Into<String>, expected: usize, actual: &[usize]) -> Self {
        Self::RankMismatch {
            context: context.into(),
            expected,
            actual: actual.to_vec(),
        }
    }
}
