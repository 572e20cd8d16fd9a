//! Interop with the `image` crate's flat sample buffers.
//!
//! A foreign buffer is described by a [`SampleLayout`]: a channel count plus
//! three strides (channel, column, row) measured in samples. Multi-channel
//! element types such as `[u8; 3]` take all channels of a foreign pixel into
//! one element; single-channel element types take each foreign channel as a
//! separate plane. Any other channel count is rejected with
//! [`ViewError::PlaneMismatch`] before the target view is touched.

use crate::core::error::{ViewError, ViewResult};
use crate::core::pixel::Pixel;
use crate::core::traits::Capabilities;
use crate::raster::protocol::ImageSource;
use crate::view::ImageView;
use image::flat::{FlatSamples, SampleLayout};
use image::{ImageBuffer, Pixel as ImagePixel};
use log::{debug, warn};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

/// A validated, borrowed foreign sample buffer usable as an image source.
pub struct FlatSource<'a, P: Pixel> {
    samples: &'a [P::Channel],
    cols: usize,
    rows: usize,
    planes: usize,
    channel_stride: usize,
    col_stride: usize,
    row_stride: usize,
    _pixel: PhantomData<fn() -> P>,
}

impl<'a, P: Pixel> FlatSource<'a, P> {
    /// Validate `layout` against `samples` and the element type `P`.
    ///
    /// Fails with `PlaneMismatch` when the foreign channel count cannot be
    /// represented by `P`, and with `BufferTooSmall` when the layout addresses
    /// samples past the end of the slice.
    pub fn new(samples: &'a [P::Channel], layout: &SampleLayout) -> ViewResult<Self> {
        let channels = usize::from(layout.channels);
        let planes = if P::CHANNELS == 1 {
            channels
        } else if channels == P::CHANNELS {
            1
        } else {
            warn!(
                "FlatSource: element type has {} channels, foreign buffer has {}",
                P::CHANNELS,
                channels
            );
            return Err(ViewError::PlaneMismatch {
                expected: P::CHANNELS,
                got: channels,
            });
        };

        let cols = layout.width as usize;
        let rows = layout.height as usize;
        let required = required_len(layout)?;
        if required > samples.len() {
            warn!(
                "FlatSource: layout needs {} samples, buffer has {}",
                required,
                samples.len()
            );
            return Err(ViewError::BufferTooSmall {
                required,
                available: samples.len(),
            });
        }

        Ok(Self {
            samples,
            cols,
            rows,
            planes,
            channel_stride: layout.channel_stride,
            col_stride: layout.width_stride,
            row_stride: layout.height_stride,
            _pixel: PhantomData,
        })
    }

    /// Borrow a [`FlatSamples`] buffer.
    pub fn from_flat<B>(flat: &'a FlatSamples<B>) -> ViewResult<Self>
    where
        B: AsRef<[P::Channel]>,
    {
        Self::new(flat.samples.as_ref(), &flat.layout)
    }

    #[inline]
    fn index(&self, channel: usize, col: usize, row: usize) -> usize {
        channel * self.channel_stride + col * self.col_stride + row * self.row_stride
    }
}

impl<P: Pixel> ImageSource for FlatSource<'_, P> {
    type Pixel = P;
    const CAPABILITIES: Capabilities = Capabilities::PURE;

    fn cols(&self) -> usize {
        self.cols
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn planes(&self) -> usize {
        self.planes
    }

    fn pixel(&self, col: usize, row: usize, plane: usize) -> P {
        let first = if P::CHANNELS == 1 { plane } else { 0 };
        let mut pixel = P::default();
        for (i, dst) in pixel.channels_mut().iter_mut().enumerate() {
            *dst = self.samples[self.index(first + i, col, row)];
        }
        pixel
    }
}

impl<P: Pixel> fmt::Debug for FlatSource<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatSource")
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("planes", &self.planes)
            .field("samples", &self.samples.len())
            .finish_non_exhaustive()
    }
}

/// One past the highest sample index `layout` can address.
fn required_len(layout: &SampleLayout) -> ViewResult<usize> {
    if layout.channels == 0 || layout.width == 0 || layout.height == 0 {
        return Ok(0);
    }
    let span = |count: usize, stride: usize| (count - 1).checked_mul(stride);
    let last = span(usize::from(layout.channels), layout.channel_stride)
        .zip(span(layout.width as usize, layout.width_stride))
        .zip(span(layout.height as usize, layout.height_stride))
        .and_then(|((c, x), y)| c.checked_add(x)?.checked_add(y)?.checked_add(1));
    last.ok_or_else(|| ViewError::InvalidLayout {
        reason: format!(
            "foreign layout {}x{}x{} with strides ({}, {}, {}) overflows",
            layout.width,
            layout.height,
            layout.channels,
            layout.channel_stride,
            layout.width_stride,
            layout.height_stride
        ),
    })
}

/// Packed interleaved layout: channels, then columns, then rows.
fn packed_layout(channels: u8, width: u32, height: u32) -> SampleLayout {
    let channels_usize = usize::from(channels);
    SampleLayout {
        channels,
        channel_stride: 1,
        width,
        width_stride: channels_usize,
        height,
        height_stride: channels_usize * width as usize,
    }
}

fn to_u32(dimension: &str, value: usize) -> ViewResult<u32> {
    u32::try_from(value).map_err(|_| ViewError::DimensionTooLarge {
        dimension: dimension.to_string(),
        value,
    })
}

impl<P: Pixel> ImageView<P> {
    /// Create a view holding a copy of a foreign sample buffer.
    pub fn from_flat_samples<B>(flat: &FlatSamples<B>) -> ViewResult<Self>
    where
        B: AsRef<[P::Channel]>,
    {
        let mut view = Self::new();
        view.copy_from_flat_samples(flat)?;
        Ok(view)
    }

    /// Resize to the foreign buffer's extent and copy its samples in.
    ///
    /// The buffer is validated first; on error this view is unchanged.
    pub fn copy_from_flat_samples<B>(&mut self, flat: &FlatSamples<B>) -> ViewResult<()>
    where
        B: AsRef<[P::Channel]>,
    {
        let source = FlatSource::<P>::from_flat(flat)?;
        debug!(
            "ImageView: copying {} from a {}-channel foreign buffer",
            source.extent(),
            flat.layout.channels
        );
        self.assign(&source)
    }

    /// Create a view holding a copy of an `image` crate buffer.
    pub fn from_image_buffer<Q, C>(buffer: &ImageBuffer<Q, C>) -> ViewResult<Self>
    where
        Q: ImagePixel<Subpixel = P::Channel>,
        C: Deref<Target = [Q::Subpixel]>,
    {
        let layout = packed_layout(Q::CHANNEL_COUNT, buffer.width(), buffer.height());
        let samples: &[Q::Subpixel] = buffer;
        let mut view = Self::new();
        view.assign(&FlatSource::<P>::new(samples, &layout)?)?;
        Ok(view)
    }

    /// Copy out as packed interleaved samples.
    ///
    /// A single-channel element type exports its planes as channels. A
    /// multi-channel element type requires a single-plane view.
    pub fn to_flat_samples(&self) -> ViewResult<FlatSamples<Vec<P::Channel>>> {
        let channels = if P::CHANNELS == 1 {
            self.planes()
        } else if self.planes() == 1 {
            P::CHANNELS
        } else {
            return Err(ViewError::PlaneMismatch {
                expected: 1,
                got: self.planes(),
            });
        };
        let channels_u8 = u8::try_from(channels).map_err(|_| ViewError::DimensionTooLarge {
            dimension: "channels".to_string(),
            value: channels,
        })?;
        let width = to_u32("cols", self.cols())?;
        let height = to_u32("rows", self.rows())?;

        let count = self
            .extent()
            .volume()
            .and_then(|n| n.checked_mul(P::CHANNELS))
            .ok_or(ViewError::ExtentOverflow {
                extent: self.extent(),
            })?;
        let mut samples = Vec::with_capacity(count);
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                for plane in 0..self.planes() {
                    let pixel = ImageSource::pixel(self, col, row, plane);
                    samples.extend_from_slice(pixel.channels());
                }
            }
        }

        Ok(FlatSamples {
            samples,
            layout: packed_layout(channels_u8, width, height),
            color_hint: None,
        })
    }

    /// Copy out as an `image` crate buffer of pixel type `Q`.
    pub fn to_image_buffer<Q>(&self) -> ViewResult<ImageBuffer<Q, Vec<Q::Subpixel>>>
    where
        Q: ImagePixel<Subpixel = P::Channel>,
    {
        let flat = self.to_flat_samples()?;
        if flat.layout.channels != Q::CHANNEL_COUNT {
            warn!(
                "ImageView: cannot export {} channels as a {}-channel pixel",
                flat.layout.channels,
                Q::CHANNEL_COUNT
            );
            return Err(ViewError::PlaneMismatch {
                expected: usize::from(Q::CHANNEL_COUNT),
                got: usize::from(flat.layout.channels),
            });
        }
        let available = flat.samples.len();
        ImageBuffer::from_raw(flat.layout.width, flat.layout.height, flat.samples).ok_or(
            ViewError::BufferTooSmall {
                required: usize::from(Q::CHANNEL_COUNT)
                    * flat.layout.width as usize
                    * flat.layout.height as usize,
                available,
            },
        )
    }
}
