//! Core types and traits shared by every part of the crate.
//!
//! This module contains:
//! - Error types
//! - The pixel (element type) constraint
//! - Capability flags and the resizable trait

pub mod error;
pub mod pixel;
pub mod traits;

// Re-export commonly used types
pub use error::{ConfigError, ConfigResult, ViewError, ViewResult};
pub use pixel::Pixel;
pub use traits::{capabilities_of, Capabilities, Resizable};
