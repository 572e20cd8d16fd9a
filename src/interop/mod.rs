//! Adapters to foreign pixel containers.
//!
//! - [`flat`]: copies to and from the `image` crate's `FlatSamples` and `ImageBuffer`

pub mod flat;

pub use flat::FlatSource;
