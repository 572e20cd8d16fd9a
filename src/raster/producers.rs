//! Lazily evaluated image sources.
//!
//! None of these own pixel storage. They describe a computation over an
//! extent and only run it when rasterized (or when a pixel is requested).
//!
//! | Producer          | Evaluates                        | Capabilities              |
//! |-------------------|----------------------------------|---------------------------|
//! | [`PerPixelView`]  | a pure `Fn(col, row, plane)`     | multiply accessible       |
//! | [`GeneratorView`] | a stateful `FnMut(col, row, plane)` | none                   |
//! | [`ConstantView`]  | one value everywhere             | multiply accessible       |
//! | [`MapView`]       | a function of another source     | inherited, never stored   |
//! | [`CropView`]      | a window of another source       | inherited, never resizable|

use crate::core::error::{ViewError, ViewResult};
use crate::core::pixel::Pixel;
use crate::core::traits::Capabilities;
use crate::memory::stride::Extent;
use crate::raster::protocol::ImageSource;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

/// A source whose pixels are computed by a pure function of the coordinate.
///
/// The function must not have observable side effects; that is what lets
/// this source be sampled repeatedly.
pub struct PerPixelView<F, P> {
    extent: Extent,
    func: F,
    _pixel: PhantomData<fn() -> P>,
}

/// A single-plane source with `value = func(col, row)`.
pub fn per_pixel<P, F>(
    cols: usize,
    rows: usize,
    func: F,
) -> PerPixelView<impl Fn(usize, usize, usize) -> P, P>
where
    P: Pixel,
    F: Fn(usize, usize) -> P,
{
    PerPixelView::new(Extent::new(cols, rows, 1), move |col, row, _| func(col, row))
}

impl<F, P> PerPixelView<F, P>
where
    P: Pixel,
    F: Fn(usize, usize, usize) -> P,
{
    /// A source over `extent` with `value = func(col, row, plane)`.
    pub fn new(extent: Extent, func: F) -> Self {
        Self {
            extent,
            func,
            _pixel: PhantomData,
        }
    }
}

impl<F, P> ImageSource for PerPixelView<F, P>
where
    P: Pixel,
    F: Fn(usize, usize, usize) -> P,
{
    type Pixel = P;
    const CAPABILITIES: Capabilities = Capabilities::PURE;

    fn cols(&self) -> usize {
        self.extent.cols
    }

    fn rows(&self) -> usize {
        self.extent.rows
    }

    fn planes(&self) -> usize {
        self.extent.planes
    }

    #[inline]
    fn pixel(&self, col: usize, row: usize, plane: usize) -> P {
        (self.func)(col, row, plane)
    }
}

impl<F, P> fmt::Debug for PerPixelView<F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerPixelView")
            .field("extent", &self.extent)
            .finish_non_exhaustive()
    }
}

/// A source driven by a stateful closure.
///
/// Each evaluation may change hidden state (a decoder cursor, a random
/// generator, a counter), so sampling the same coordinate twice is not
/// guaranteed to agree and the source is not multiply accessible.
pub struct GeneratorView<F, P> {
    extent: Extent,
    func: RefCell<F>,
    _pixel: PhantomData<fn() -> P>,
}

impl<F, P> GeneratorView<F, P>
where
    P: Pixel,
    F: FnMut(usize, usize, usize) -> P,
{
    /// A source over `extent` that calls `func` once per evaluated pixel.
    pub fn new(extent: Extent, func: F) -> Self {
        Self {
            extent,
            func: RefCell::new(func),
            _pixel: PhantomData,
        }
    }
}

impl<F, P> ImageSource for GeneratorView<F, P>
where
    P: Pixel,
    F: FnMut(usize, usize, usize) -> P,
{
    type Pixel = P;

    fn cols(&self) -> usize {
        self.extent.cols
    }

    fn rows(&self) -> usize {
        self.extent.rows
    }

    fn planes(&self) -> usize {
        self.extent.planes
    }

    fn pixel(&self, col: usize, row: usize, plane: usize) -> P {
        (self.func.borrow_mut())(col, row, plane)
    }
}

impl<F, P> fmt::Debug for GeneratorView<F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorView")
            .field("extent", &self.extent)
            .finish_non_exhaustive()
    }
}

/// A source with the same value at every coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantView<P> {
    extent: Extent,
    value: P,
}

impl<P: Pixel> ConstantView<P> {
    /// A constant source over `extent`.
    pub fn new(extent: Extent, value: P) -> Self {
        Self { extent, value }
    }

    /// The value every pixel has.
    pub fn value(&self) -> P {
        self.value
    }
}

impl<P: Pixel> ImageSource for ConstantView<P> {
    type Pixel = P;
    const CAPABILITIES: Capabilities = Capabilities::PURE;

    fn cols(&self) -> usize {
        self.extent.cols
    }

    fn rows(&self) -> usize {
        self.extent.rows
    }

    fn planes(&self) -> usize {
        self.extent.planes
    }

    #[inline]
    fn pixel(&self, _col: usize, _row: usize, _plane: usize) -> P {
        self.value
    }
}

/// A source applying a function to every pixel of another source.
pub struct MapView<S, F, Q> {
    source: S,
    func: F,
    _pixel: PhantomData<fn() -> Q>,
}

impl<S, F, Q> ImageSource for MapView<S, F, Q>
where
    S: ImageSource,
    F: Fn(S::Pixel) -> Q,
    Q: Pixel,
{
    type Pixel = Q;
    const CAPABILITIES: Capabilities =
        S::CAPABILITIES.intersection(Capabilities::MULTIPLY_ACCESSIBLE);

    fn cols(&self) -> usize {
        self.source.cols()
    }

    fn rows(&self) -> usize {
        self.source.rows()
    }

    fn planes(&self) -> usize {
        self.source.planes()
    }

    #[inline]
    fn pixel(&self, col: usize, row: usize, plane: usize) -> Q {
        (self.func)(self.source.pixel(col, row, plane))
    }
}

/// A rectangular window of another source, across all of its planes.
#[derive(Debug, Clone)]
pub struct CropView<S> {
    source: S,
    col: usize,
    row: usize,
    cols: usize,
    rows: usize,
}

impl<S: ImageSource> CropView<S> {
    /// A `cols x rows` window of `source` starting at `(col, row)`.
    pub fn new(source: S, col: usize, row: usize, cols: usize, rows: usize) -> ViewResult<Self> {
        let fits_cols = col.checked_add(cols).is_some_and(|end| end <= source.cols());
        let fits_rows = row.checked_add(rows).is_some_and(|end| end <= source.rows());
        if !fits_cols || !fits_rows {
            return Err(ViewError::Argument(format!(
                "window {}x{} at ({}, {}) exceeds a {} source",
                cols,
                rows,
                col,
                row,
                source.extent()
            )));
        }
        Ok(Self {
            source,
            col,
            row,
            cols,
            rows,
        })
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: ImageSource> ImageSource for CropView<S> {
    type Pixel = S::Pixel;
    const CAPABILITIES: Capabilities = S::CAPABILITIES.difference(Capabilities::RESIZABLE);

    fn cols(&self) -> usize {
        self.cols
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn planes(&self) -> usize {
        self.source.planes()
    }

    #[inline]
    fn pixel(&self, col: usize, row: usize, plane: usize) -> S::Pixel {
        self.source.pixel(col + self.col, row + self.row, plane)
    }
}

/// Fluent composition of lazy producers.
pub trait SourceExt: ImageSource + Sized {
    /// Apply `func` to every pixel, lazily.
    fn map_pixels<Q, F>(self, func: F) -> MapView<Self, F, Q>
    where
        Q: Pixel,
        F: Fn(Self::Pixel) -> Q,
    {
        MapView {
            source: self,
            func,
            _pixel: PhantomData,
        }
    }

    /// A lazy `cols x rows` window starting at `(col, row)`.
    fn window(self, col: usize, row: usize, cols: usize, rows: usize) -> ViewResult<CropView<Self>> {
        CropView::new(self, col, row, cols, rows)
    }
}

impl<S: ImageSource> SourceExt for S {}
