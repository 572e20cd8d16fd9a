//! The materialized image container.
//!
//! - [`image_view`]: [`ImageView`], the shared, resizable, strided view
//! - [`strided`]: zero-copy crops, flips, transposes and plane selection

pub mod image_view;
pub mod strided;

pub use image_view::ImageView;
