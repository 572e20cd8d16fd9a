//! # Ambara Raster - Shared In-Memory Image Views
//!
//! The storage layer beneath Ambara's image pipeline. Decoders, filters,
//! tilers and the viewer all meet at one container, [`ImageView`], and one
//! protocol, rasterization from an [`ImageSource`] into an [`ImageSink`].
//!
//! ## Features
//!
//! - **Shared buffers**: copying a view is O(1) and aliases the same pixels
//! - **Strided addressing**: crops, flips and transposes without copying
//! - **Lazy producers**: closures, constants and maps rasterize on demand
//! - **Capability flags**: generic code knows at compile time whether a source
//!   can be sampled twice, resized, or referenced
//! - **Block traversal**: fixed-size blocks for texture upload and tiling
//! - **Interop**: copy to and from the `image` crate's buffers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ambara_raster::prelude::*;
//!
//! // A 4x3 single-plane view of zeros
//! let mut view = ImageView::<i32>::with_size(4, 3, 1)?;
//! view[(2, 1)].set(7);
//!
//! // Shallow copy: both views see the same pixel
//! let alias = view.clone();
//! assert_eq!(alias[(2, 1)].get(), 7);
//!
//! // Materialize a computed source
//! view.assign(&per_pixel(3, 2, |c, r| (c + 10 * r) as i32))?;
//! assert_eq!(view[(2, 1)].get(), 12);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: errors, the pixel constraint and capability flags
//! - [`memory`]: buffers, strides and the unchecked accessor
//! - [`view`]: the [`ImageView`] container and its zero-copy re-stridings
//! - [`raster`]: the rasterization protocol, producers and block traversal
//! - [`interop`]: adapters to the `image` crate
//!
//! Views are single-threaded. The buffer reference count is not atomic, so
//! [`ImageView`] is neither `Send` nor `Sync`; hand pixels to another thread
//! by copying them out (for example with [`ImageView::to_flat_samples`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod interop;
pub mod memory;
pub mod raster;
pub mod view;

pub use crate::raster::protocol::{ImageSink, ImageSource};
pub use crate::view::ImageView;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use ambara_raster::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use crate::core::error::{ConfigError, ConfigResult, ViewError, ViewResult};
    pub use crate::core::pixel::Pixel;
    pub use crate::core::traits::{capabilities_of, Capabilities, Resizable};

    // Addressing
    pub use crate::memory::accessor::PixelAccessor;
    pub use crate::memory::stride::{Extent, Layout, Strides};

    // Views
    pub use crate::view::ImageView;

    // Rasterization
    pub use crate::raster::blocks::{
        block_bytes, rasterize_blocks, BlockConfig, BlockIterator, BlockRegion,
    };
    pub use crate::raster::materialize::{materialize, Prepared};
    pub use crate::raster::producers::{
        per_pixel, ConstantView, CropView, GeneratorView, MapView, PerPixelView, SourceExt,
    };
    pub use crate::raster::protocol::{assign, check_extent, rasterize, ImageSink, ImageSource};

    // Interop
    pub use crate::interop::flat::FlatSource;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "ambara-raster");
    }

    #[test]
    fn test_prelude_quick_start() {
        let mut view = ImageView::<i32>::with_size(4, 3, 1).unwrap();
        view[(2, 1)].set(7);

        let alias = view.clone();
        assert_eq!(alias[(2, 1)].get(), 7);

        view.assign(&per_pixel(3, 2, |c, r| (c + 10 * r) as i32))
            .unwrap();
        assert_eq!(view[(2, 1)].get(), 12);
        assert_eq!(alias.extent(), Extent::new(4, 3, 1));
    }

    #[test]
    fn test_generic_code_sees_capabilities() {
        fn needs_copy<S: ImageSource>(_: &S) -> bool {
            !S::CAPABILITIES.is_multiply_accessible()
        }

        let view = ImageView::<u8>::new();
        let counter = GeneratorView::new(Extent::new(1, 1, 1), |_, _, _| 0u8);
        assert!(!needs_copy(&view));
        assert!(needs_copy(&counter));
        assert_eq!(capabilities_of(&view), Capabilities::MATERIALIZED);
    }
}
