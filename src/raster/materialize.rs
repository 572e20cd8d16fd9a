//! Capability-driven preparation of a source for repeated random access.
//!
//! Algorithms that sample the same coordinates more than once (resamplers,
//! edge extension, pyramid builders) cannot do so safely on a source with
//! hidden state. [`Prepared`] checks the source's `MULTIPLY_ACCESSIBLE` flag
//! at compile time: such sources are borrowed as they are, anything else is
//! rasterized once into a temporary [`ImageView`].

use crate::core::error::ViewResult;
use crate::core::traits::Capabilities;
use crate::raster::protocol::{ImageSink, ImageSource};
use crate::view::ImageView;
use log::debug;

/// A source that is safe to sample repeatedly.
#[derive(Debug)]
pub enum Prepared<'a, S: ImageSource> {
    /// The source itself; it was already multiply accessible.
    Borrowed(&'a S),
    /// A materialized copy of a source that was not.
    Rendered(ImageView<S::Pixel>),
}

impl<'a, S: ImageSource> Prepared<'a, S> {
    /// Borrow `source` if it is multiply accessible, otherwise render it.
    pub fn new(source: &'a S) -> ViewResult<Self> {
        if S::CAPABILITIES.is_multiply_accessible() {
            return Ok(Prepared::Borrowed(source));
        }
        debug!(
            "Prepared: rendering {} source with capabilities {:?} for random access",
            source.extent(),
            S::CAPABILITIES
        );
        Ok(Prepared::Rendered(ImageView::from_source(source)?))
    }

    /// Check if a temporary copy was made.
    pub fn is_rendered(&self) -> bool {
        matches!(self, Prepared::Rendered(_))
    }
}

impl<S: ImageSource> ImageSource for Prepared<'_, S> {
    type Pixel = S::Pixel;
    const CAPABILITIES: Capabilities = Capabilities::MULTIPLY_ACCESSIBLE;

    fn cols(&self) -> usize {
        match self {
            Prepared::Borrowed(source) => source.cols(),
            Prepared::Rendered(view) => view.cols(),
        }
    }

    fn rows(&self) -> usize {
        match self {
            Prepared::Borrowed(source) => source.rows(),
            Prepared::Rendered(view) => view.rows(),
        }
    }

    fn planes(&self) -> usize {
        match self {
            Prepared::Borrowed(source) => source.planes(),
            Prepared::Rendered(view) => view.planes(),
        }
    }

    #[inline]
    fn pixel(&self, col: usize, row: usize, plane: usize) -> S::Pixel {
        match self {
            Prepared::Borrowed(source) => source.pixel(col, row, plane),
            Prepared::Rendered(view) => ImageSource::pixel(view, col, row, plane),
        }
    }

    fn rasterize<D>(&self, dest: &mut D) -> ViewResult<()>
    where
        D: ImageSink<Pixel = S::Pixel> + ?Sized,
    {
        match self {
            Prepared::Borrowed(source) => source.rasterize(dest),
            Prepared::Rendered(view) => view.rasterize(dest),
        }
    }
}

/// Rasterize any source into a new view.
pub fn materialize<S: ImageSource + ?Sized>(source: &S) -> ViewResult<ImageView<S::Pixel>> {
    ImageView::from_source(source)
}
