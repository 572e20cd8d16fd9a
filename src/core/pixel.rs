//! Element types that can be stored in an image view.
//!
//! A pixel is plain data: it is `Copy`, has a `Default` used to initialize
//! fresh storage, and is made of `CHANNELS` interleaved scalar channels.
//! Primitive numbers are single-channel pixels, fixed arrays of primitives are
//! multi-channel pixels.

use image::Primitive;

/// A plain-data element of an image view.
pub trait Pixel: Copy + Default + 'static {
    /// Scalar type of each interleaved channel.
    type Channel: Primitive + bytemuck::Pod + Default;

    /// Number of interleaved channels in one pixel.
    const CHANNELS: usize;

    /// The channels of this pixel, in order.
    fn channels(&self) -> &[Self::Channel];

    /// Mutable access to the channels of this pixel.
    fn channels_mut(&mut self) -> &mut [Self::Channel];

    /// Build a pixel from exactly `CHANNELS` channel values.
    ///
    /// Missing trailing channels keep their default value.
    fn from_channels(values: &[Self::Channel]) -> Self {
        let mut pixel = Self::default();
        for (dst, src) in pixel.channels_mut().iter_mut().zip(values) {
            *dst = *src;
        }
        pixel
    }
}

macro_rules! impl_scalar_pixel {
    ($($t:ty),* $(,)?) => {
        $(
            impl Pixel for $t {
                type Channel = $t;
                const CHANNELS: usize = 1;

                #[inline]
                fn channels(&self) -> &[$t] {
                    std::slice::from_ref(self)
                }

                #[inline]
                fn channels_mut(&mut self) -> &mut [$t] {
                    std::slice::from_mut(self)
                }
            }
        )*
    };
}

impl_scalar_pixel!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl<T, const N: usize> Pixel for [T; N]
where
    T: Primitive + bytemuck::Pod + Default,
    [T; N]: Default,
{
    type Channel = T;
    const CHANNELS: usize = N;

    #[inline]
    fn channels(&self) -> &[T] {
        self.as_slice()
    }

    #[inline]
    fn channels_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}
