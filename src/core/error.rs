//! Error types for ambara-raster.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Report expected vs. actual values so the caller can recover
//! - Be serializable, so collaborators can forward them to a frontend
//! - Stay out of the per-pixel hot path (out-of-range access is not an error)

use crate::memory::stride::Extent;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by views, the rasterization protocol and interop adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewError {
    #[error("Incompatible number of planes: need {expected}, got {got}")]
    PlaneMismatch { expected: usize, got: usize },

    #[error("Extent mismatch: expected {expected}, got {got}")]
    ExtentMismatch { expected: Extent, got: Extent },

    #[error("Invalid layout: {reason}")]
    InvalidLayout { reason: String },

    #[error("Foreign buffer too small: layout needs {required} samples, buffer has {available}")]
    BufferTooSmall { required: usize, available: usize },

    #[error("Dimension '{dimension}' value {value} is out of range for the target type")]
    DimensionTooLarge { dimension: String, value: usize },

    #[error("Failed to allocate {count} elements ({bytes} bytes)")]
    Allocation { count: usize, bytes: usize },

    #[error("Extent {extent} overflows the addressable element count")]
    ExtentOverflow { extent: Extent },

    #[error("Argument error: {0}")]
    Argument(String),

    #[error("Block consumer failed: {0}")]
    Callback(String),
}

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ViewError {
    /// Check if this is a shape/argument error the caller can recover from.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            ViewError::PlaneMismatch { .. }
                | ViewError::ExtentMismatch { .. }
                | ViewError::InvalidLayout { .. }
                | ViewError::BufferTooSmall { .. }
                | ViewError::DimensionTooLarge { .. }
                | ViewError::Argument(_)
        )
    }

    /// Check if this error is fatal by convention (storage could not be obtained).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ViewError::Allocation { .. } | ViewError::ExtentOverflow { .. }
        )
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        ConfigError::Parse(error.to_string())
    }
}

/// Result type alias for view operations.
pub type ViewResult<T> = Result<T, ViewError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
