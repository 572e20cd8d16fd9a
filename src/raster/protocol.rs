//! The rasterization protocol.
//!
//! Anything that knows its extent and can evaluate a pixel at a coordinate is
//! an [`ImageSource`]. Anything that can receive pixels at coordinates is an
//! [`ImageSink`]. Rasterization pulls every pixel of a source into a sink of
//! the same extent; assignment ([`assign`]) first resizes a resizable sink to
//! the source's extent and then rasterizes.
//!
//! The canonical traversal visits planes, then rows, then columns. Sinks must
//! not depend on that order for correctness.

use crate::core::error::{ViewError, ViewResult};
use crate::core::pixel::Pixel;
use crate::core::traits::{Capabilities, Resizable};
use crate::memory::stride::Extent;

/// A producer of pixels over a three-axis extent.
pub trait ImageSource {
    /// Element type produced.
    type Pixel: Pixel;

    /// Capability flags of this source type.
    const CAPABILITIES: Capabilities = Capabilities::empty();

    /// Number of columns.
    fn cols(&self) -> usize;

    /// Number of rows.
    fn rows(&self) -> usize;

    /// Number of planes.
    fn planes(&self) -> usize {
        1
    }

    /// The full extent.
    fn extent(&self) -> Extent {
        Extent::new(self.cols(), self.rows(), self.planes())
    }

    /// Evaluate the pixel at an in-extent coordinate.
    ///
    /// Coordinates outside the extent are a caller error; implementations may
    /// panic or return an arbitrary value.
    fn pixel(&self, col: usize, row: usize, plane: usize) -> Self::Pixel;

    /// Write every pixel of this source into `dest` exactly once.
    ///
    /// `dest` must have the same extent as `self`.
    fn rasterize<D>(&self, dest: &mut D) -> ViewResult<()>
    where
        D: ImageSink<Pixel = Self::Pixel> + ?Sized,
    {
        rasterize(self, dest)
    }
}

/// A receiver of pixels over a three-axis extent.
pub trait ImageSink {
    /// Element type accepted.
    type Pixel: Pixel;

    /// Number of columns.
    fn cols(&self) -> usize;

    /// Number of rows.
    fn rows(&self) -> usize;

    /// Number of planes.
    fn planes(&self) -> usize {
        1
    }

    /// The full extent.
    fn extent(&self) -> Extent {
        Extent::new(self.cols(), self.rows(), self.planes())
    }

    /// Store `value` at an in-extent coordinate.
    fn put(&mut self, col: usize, row: usize, plane: usize, value: Self::Pixel);
}

impl<S: ImageSource + ?Sized> ImageSource for &S {
    type Pixel = S::Pixel;
    // A shared reference cannot resize its referent.
    const CAPABILITIES: Capabilities = S::CAPABILITIES.difference(Capabilities::RESIZABLE);

    fn cols(&self) -> usize {
        (**self).cols()
    }

    fn rows(&self) -> usize {
        (**self).rows()
    }

    fn planes(&self) -> usize {
        (**self).planes()
    }

    #[inline]
    fn pixel(&self, col: usize, row: usize, plane: usize) -> S::Pixel {
        (**self).pixel(col, row, plane)
    }

    fn rasterize<D>(&self, dest: &mut D) -> ViewResult<()>
    where
        D: ImageSink<Pixel = S::Pixel> + ?Sized,
    {
        (**self).rasterize(dest)
    }
}

/// Fail with `ExtentMismatch` unless `got` equals `expected`.
pub fn check_extent(expected: Extent, got: Extent) -> ViewResult<()> {
    if expected != got {
        return Err(ViewError::ExtentMismatch { expected, got });
    }
    Ok(())
}

/// Rasterize `src` into `dest` by per-pixel evaluation in canonical order.
///
/// This is the default body of [`ImageSource::rasterize`] and the reference
/// semantics every specialized implementation must match.
pub fn rasterize<S, D>(src: &S, dest: &mut D) -> ViewResult<()>
where
    S: ImageSource + ?Sized,
    D: ImageSink<Pixel = S::Pixel> + ?Sized,
{
    let extent = src.extent();
    check_extent(extent, dest.extent())?;

    for plane in 0..extent.planes {
        for row in 0..extent.rows {
            for col in 0..extent.cols {
                dest.put(col, row, plane, src.pixel(col, row, plane));
            }
        }
    }
    Ok(())
}

/// Resize `dest` to the extent of `src`, then rasterize `src` into it.
pub fn assign<S, D>(dest: &mut D, src: &S) -> ViewResult<()>
where
    S: ImageSource + ?Sized,
    D: ImageSink<Pixel = S::Pixel> + Resizable + ?Sized,
{
    dest.set_size(src.cols(), src.rows(), src.planes())?;
    src.rasterize(dest)
}
