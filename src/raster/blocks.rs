//! Fixed-size block rasterization.
//!
//! Texture caches and tilers do not want a whole image at once. They pull a
//! large source out in fixed-size blocks, upload or encode each block, and
//! move on. This module provides that traversal on top of the rasterization
//! protocol:
//!
//! - Blocks are visited in row-major order
//! - Each block is rasterized into one reused [`ImageView`]
//! - Every source pixel is evaluated exactly once
//!
//! # Example
//!
//! ```ignore
//! let config = BlockConfig::new()
//!     .with_block_size(256, 256)
//!     .with_pad_partial(true);
//!
//! rasterize_blocks(&source, &config, |region, block| {
//!     upload(region, &block_bytes(block));
//!     Ok(())
//! })?;
//! ```

use crate::core::error::{ConfigError, ConfigResult, ViewError, ViewResult};
use crate::core::pixel::Pixel;
use crate::raster::producers::CropView;
use crate::raster::protocol::ImageSource;
use crate::view::ImageView;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default block edge length in pixels.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Minimum block edge length in pixels.
pub const MIN_BLOCK_SIZE: usize = 1;

/// Maximum block edge length in pixels.
pub const MAX_BLOCK_SIZE: usize = 16384;

/// A rectangular region of a source, in source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRegion {
    /// Column of the top-left pixel.
    pub col: usize,
    /// Row of the top-left pixel.
    pub row: usize,
    /// Width of the region.
    pub cols: usize,
    /// Height of the region.
    pub rows: usize,
}

impl BlockRegion {
    /// Create a new block region.
    pub fn new(col: usize, row: usize, cols: usize, rows: usize) -> Self {
        Self {
            col,
            row,
            cols,
            rows,
        }
    }

    /// One past the last column.
    pub fn right(&self) -> usize {
        self.col + self.cols
    }

    /// One past the last row.
    pub fn bottom(&self) -> usize {
        self.row + self.rows
    }

    /// Number of pixels per plane.
    pub fn area(&self) -> usize {
        self.cols * self.rows
    }
}

/// Settings for block traversal.
///
/// Loadable from TOML; missing fields take their defaults:
///
/// ```toml
/// block_cols = 512
/// block_rows = 128
/// pad_partial = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockConfig {
    /// Block width in pixels.
    pub block_cols: usize,
    /// Block height in pixels.
    pub block_rows: usize,
    /// Deliver edge blocks at full size, padded with `P::default()`.
    pub pad_partial: bool,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            block_cols: DEFAULT_BLOCK_SIZE,
            block_rows: DEFAULT_BLOCK_SIZE,
            pad_partial: false,
        }
    }
}

impl BlockConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block size, clamped to `MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE`.
    pub fn with_block_size(mut self, cols: usize, rows: usize) -> Self {
        self.block_cols = cols.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);
        self.block_rows = rows.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);
        self
    }

    /// Enable or disable padding of partial edge blocks.
    pub fn with_pad_partial(mut self, pad: bool) -> Self {
        self.pad_partial = pad;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: BlockConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!("BlockConfig: loaded {:?} from {}", config, path.display());
        Ok(config)
    }

    /// Check that both block dimensions are within range.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [("block_cols", self.block_cols), ("block_rows", self.block_rows)] {
            if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&value) {
                return Err(ConfigError::Invalid {
                    field: field.to_string(),
                    reason: format!(
                        "{} is outside {}..={}",
                        value, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Iterator over the blocks covering a `cols x rows` area, row-major.
#[derive(Debug, Clone)]
pub struct BlockIterator {
    cols: usize,
    rows: usize,
    block_cols: usize,
    block_rows: usize,
    next_col: usize,
    next_row: usize,
}

impl BlockIterator {
    /// Create a block iterator. Zero block sizes are treated as 1.
    pub fn new(cols: usize, rows: usize, block_cols: usize, block_rows: usize) -> Self {
        Self {
            cols,
            rows,
            block_cols: block_cols.max(1),
            block_rows: block_rows.max(1),
            next_col: 0,
            // An area with no columns has no blocks either.
            next_row: if cols == 0 { rows } else { 0 },
        }
    }

    /// Total number of blocks, including ones already yielded.
    pub fn block_count(&self) -> usize {
        self.cols.div_ceil(self.block_cols) * self.rows.div_ceil(self.block_rows)
    }
}

impl Iterator for BlockIterator {
    type Item = BlockRegion;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row >= self.rows {
            return None;
        }

        let col = self.next_col;
        let row = self.next_row;
        let cols = self.block_cols.min(self.cols - col);
        let rows = self.block_rows.min(self.rows - row);

        self.next_col += self.block_cols;
        if self.next_col >= self.cols {
            self.next_col = 0;
            self.next_row += self.block_rows;
        }

        Some(BlockRegion::new(col, row, cols, rows))
    }
}

/// Rasterize `source` block by block, handing each block to `consume`.
///
/// The view passed to `consume` is reused for the next block; a consumer
/// that keeps a clone of it will see later blocks overwrite its pixels.
/// Copy with [`ImageView::assign`] or [`ImageView::to_vec`] to retain one.
///
/// Returns the number of blocks delivered. An error from `consume` stops
/// the traversal and is returned unchanged.
pub fn rasterize_blocks<S, F>(source: &S, config: &BlockConfig, mut consume: F) -> ViewResult<usize>
where
    S: ImageSource + ?Sized,
    F: FnMut(BlockRegion, &ImageView<S::Pixel>) -> ViewResult<()>,
{
    config
        .validate()
        .map_err(|error| ViewError::Argument(error.to_string()))?;

    let extent = source.extent();
    let blocks = BlockIterator::new(
        extent.cols,
        extent.rows,
        config.block_cols,
        config.block_rows,
    );
    let total = blocks.block_count();
    if total == 0 || extent.planes == 0 {
        debug!("rasterize_blocks: {} source has no blocks", extent);
        return Ok(0);
    }

    let block_cols = config.block_cols.min(extent.cols);
    let block_rows = config.block_rows.min(extent.rows);
    let (alloc_cols, alloc_rows) = if config.pad_partial {
        (config.block_cols, config.block_rows)
    } else {
        (block_cols, block_rows)
    };
    let block = ImageView::<S::Pixel>::with_size(alloc_cols, alloc_rows, extent.planes)?;

    debug!(
        "rasterize_blocks: {} source in {} blocks of {}x{} (pad_partial: {})",
        extent, total, config.block_cols, config.block_rows, config.pad_partial
    );

    let mut delivered = 0;
    for region in blocks {
        trace!("rasterize_blocks: block {:?}", region);
        let window = CropView::new(source, region.col, region.row, region.cols, region.rows)?;

        let target = if config.pad_partial {
            let partial = region.cols < alloc_cols || region.rows < alloc_rows;
            if partial {
                block.fill(S::Pixel::default());
            }
            block.clone()
        } else {
            block.crop(0, 0, region.cols, region.rows)?
        };
        target
            .crop(0, 0, region.cols, region.rows)?
            .rasterize_from(&window)?;

        consume(region, &target)?;
        delivered += 1;
    }

    Ok(delivered)
}

/// Flatten a view into interleaved channel bytes in canonical order.
///
/// The byte order is native-endian, as expected by texture uploads.
pub fn block_bytes<P: Pixel>(view: &ImageView<P>) -> Vec<u8> {
    let count = view.extent().volume().unwrap_or(0) * P::CHANNELS;
    let mut samples: Vec<P::Channel> = Vec::with_capacity(count);
    for pixel in view.iter() {
        samples.extend_from_slice(pixel.channels());
    }
    bytemuck::cast_slice(&samples).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::stride::Extent;
    use crate::raster::producers::{per_pixel, GeneratorView};
    use std::cell::Cell;
    use std::io::Write;

    #[test]
    fn test_block_region() {
        let region = BlockRegion::new(10, 20, 100, 200);
        assert_eq!(region.right(), 110);
        assert_eq!(region.bottom(), 220);
        assert_eq!(region.area(), 20000);
    }

    #[test]
    fn test_block_iterator() {
        let iter = BlockIterator::new(1000, 1000, 256, 256);
        assert_eq!(iter.block_count(), 16);

        let blocks: Vec<_> = BlockIterator::new(100, 100, 64, 64).collect();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0], BlockRegion::new(0, 0, 64, 64));
        assert_eq!(blocks[1], BlockRegion::new(64, 0, 36, 64));
        assert_eq!(blocks[3], BlockRegion::new(64, 64, 36, 36));
    }

    #[test]
    fn test_block_iterator_empty_area() {
        assert_eq!(BlockIterator::new(0, 10, 4, 4).count(), 0);
        assert_eq!(BlockIterator::new(10, 0, 4, 4).count(), 0);
        assert_eq!(BlockIterator::new(0, 10, 4, 4).block_count(), 0);
    }

    #[test]
    fn test_config_builders() {
        let config = BlockConfig::new()
            .with_block_size(0, 100_000)
            .with_pad_partial(true);
        assert_eq!(config.block_cols, MIN_BLOCK_SIZE);
        assert_eq!(config.block_rows, MAX_BLOCK_SIZE);
        assert!(config.pad_partial);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let config = BlockConfig::from_toml_str("block_cols = 32\npad_partial = true\n").unwrap();
        assert_eq!(config.block_cols, 32);
        assert_eq!(config.block_rows, DEFAULT_BLOCK_SIZE);
        assert!(config.pad_partial);

        let error = BlockConfig::from_toml_str("block_rows = 0").unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { ref field, .. } if field == "block_rows"));

        let error = BlockConfig::from_toml_str("tile_size = 3").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "block_cols = 8").unwrap();
        writeln!(file, "block_rows = 4").unwrap();
        let config = BlockConfig::load(file.path()).unwrap();
        assert_eq!((config.block_cols, config.block_rows), (8, 4));

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            BlockConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_blocks_cover_source() {
        let src = per_pixel(5, 3, |c, r| (c + 10 * r) as u32);
        let config = BlockConfig::new().with_block_size(2, 2);

        let mut seen = Vec::new();
        let count = rasterize_blocks(&src, &config, |region, block| {
            assert_eq!(block.cols(), region.cols);
            assert_eq!(block.rows(), region.rows);
            for r in 0..region.rows {
                for c in 0..region.cols {
                    assert_eq!(block[(c, r)].get(), (region.col + c + 10 * (region.row + r)) as u32);
                }
            }
            seen.push(region);
            Ok(())
        })
        .unwrap();

        assert_eq!(count, 6);
        assert_eq!(seen.iter().map(BlockRegion::area).sum::<usize>(), 15);
        assert_eq!(seen[2], BlockRegion::new(4, 0, 1, 2));
    }

    #[test]
    fn test_blocks_pad_partial() {
        let src = per_pixel(3, 1, |_, _| 9u8);
        let config = BlockConfig::new().with_block_size(2, 2).with_pad_partial(true);

        let mut blocks = Vec::new();
        rasterize_blocks(&src, &config, |region, block| {
            blocks.push((region, block.to_vec()));
            Ok(())
        })
        .unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].1, vec![9, 9, 0, 0]);
        assert_eq!(blocks[1].0, BlockRegion::new(2, 0, 1, 1));
        assert_eq!(blocks[1].1, vec![9, 0, 0, 0]);
    }

    #[test]
    fn test_blocks_evaluate_each_pixel_once() {
        let calls = Cell::new(0usize);
        let src = GeneratorView::new(Extent::new(7, 5, 2), |_, _, _| {
            calls.set(calls.get() + 1);
            0u8
        });
        let config = BlockConfig::new().with_block_size(3, 2);
        rasterize_blocks(&src, &config, |_, _| Ok(())).unwrap();
        assert_eq!(calls.get(), 70);
    }

    #[test]
    fn test_blocks_consumer_error_stops() {
        let src = per_pixel(4, 4, |_, _| 0u8);
        let config = BlockConfig::new().with_block_size(2, 2);
        let mut visited = 0;
        let error = rasterize_blocks(&src, &config, |_, _| {
            visited += 1;
            if visited == 2 {
                return Err(ViewError::Callback("upload queue full".to_string()));
            }
            Ok(())
        })
        .unwrap_err();
        assert_eq!(visited, 2);
        assert_eq!(error, ViewError::Callback("upload queue full".to_string()));
    }

    #[test]
    fn test_blocks_empty_source() {
        let src = per_pixel(0, 4, |_, _| 0u8);
        let count = rasterize_blocks(&src, &BlockConfig::default(), |_, _| Ok(())).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_block_bytes() {
        let view = ImageView::<[u16; 2]>::with_size(2, 1, 1).unwrap();
        view[(0, 0)].set([1, 2]);
        view[(1, 0)].set([3, 0x0102]);
        let bytes = block_bytes(&view);
        assert_eq!(bytes.len(), 8);

        let expected: Vec<u8> = [1u16, 2, 3, 0x0102]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        assert_eq!(bytes, expected);
    }
}
