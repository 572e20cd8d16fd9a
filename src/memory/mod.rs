//! Storage and addressing beneath image views.
//!
//! - [`stride`]: extents, strides and layouts
//! - [`accessor`]: the unchecked stepping cursor
//! - `buffer`: the reference-counted allocation (crate-internal)

pub(crate) mod buffer;
pub mod accessor;
pub mod stride;

pub use accessor::PixelAccessor;
pub use stride::{Extent, Layout, Strides};
