//! Producers, sinks and the protocol that connects them.
//!
//! - [`protocol`]: [`ImageSource`] / [`ImageSink`] and the canonical rasterize loop
//! - [`producers`]: lazily evaluated sources (closures, constants, maps, windows)
//! - [`materialize`]: render-or-borrow selection driven by capability flags
//! - [`blocks`]: fixed-size block traversal for tilers and texture caches

pub mod blocks;
pub mod materialize;
pub mod producers;
pub mod protocol;

pub use blocks::{block_bytes, rasterize_blocks, BlockConfig, BlockIterator, BlockRegion};
pub use materialize::{materialize, Prepared};
pub use producers::{
    per_pixel, ConstantView, CropView, GeneratorView, MapView, PerPixelView, SourceExt,
};
pub use protocol::{assign, check_extent, rasterize, ImageSink, ImageSource};
