//! Unchecked stepping cursor over a strided address space.
//!
//! A [`PixelAccessor`] is what generic traversal loops use instead of
//! recomputing `origin + c*cs + r*rs + p*ps` for every element: each step is a
//! single pointer offset. Stepping never checks bounds and is always safe;
//! dereferencing is `unsafe` because the cursor may have walked outside the
//! view it came from.

use crate::core::pixel::Pixel;
use crate::memory::stride::Strides;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

/// A cursor positioned at one element of a view.
///
/// Holds no ownership; the `'a` lifetime ties it to the view it was derived from.
pub struct PixelAccessor<'a, P: Pixel> {
    ptr: *const Cell<P>,
    strides: Strides,
    _view: PhantomData<&'a [Cell<P>]>,
}

impl<'a, P: Pixel> PixelAccessor<'a, P> {
    /// Create a cursor at `ptr` stepping by `strides`.
    #[inline]
    pub(crate) fn new(ptr: *const Cell<P>, strides: Strides) -> Self {
        Self {
            ptr,
            strides,
            _view: PhantomData,
        }
    }

    /// The strides this cursor steps by.
    #[inline]
    pub fn strides(&self) -> Strides {
        self.strides
    }

    /// Current address.
    #[inline]
    pub fn as_ptr(&self) -> *const Cell<P> {
        self.ptr
    }

    #[inline]
    fn step(&mut self, delta: isize) -> &mut Self {
        self.ptr = self.ptr.wrapping_offset(delta);
        self
    }

    /// Move one column forward.
    #[inline]
    pub fn next_col(&mut self) -> &mut Self {
        self.step(self.strides.col)
    }

    /// Move one column back.
    #[inline]
    pub fn prev_col(&mut self) -> &mut Self {
        self.step(-self.strides.col)
    }

    /// Move one row forward.
    #[inline]
    pub fn next_row(&mut self) -> &mut Self {
        self.step(self.strides.row)
    }

    /// Move one row back.
    #[inline]
    pub fn prev_row(&mut self) -> &mut Self {
        self.step(-self.strides.row)
    }

    /// Move one plane forward.
    #[inline]
    pub fn next_plane(&mut self) -> &mut Self {
        self.step(self.strides.plane)
    }

    /// Move one plane back.
    #[inline]
    pub fn prev_plane(&mut self) -> &mut Self {
        self.step(-self.strides.plane)
    }

    /// Move by an arbitrary number of steps along each axis.
    #[inline]
    pub fn advance(&mut self, cols: isize, rows: isize, planes: isize) -> &mut Self {
        let delta = cols
            .wrapping_mul(self.strides.col)
            .wrapping_add(rows.wrapping_mul(self.strides.row))
            .wrapping_add(planes.wrapping_mul(self.strides.plane));
        self.step(delta)
    }

    /// The element under the cursor.
    ///
    /// # Safety
    ///
    /// The cursor must address an element inside the view it was derived from.
    #[inline]
    pub unsafe fn cell(&self) -> &'a Cell<P> {
        // SAFETY: caller guarantees the address is inside live storage borrowed for 'a.
        unsafe { &*self.ptr }
    }

    /// Read the element under the cursor.
    ///
    /// # Safety
    ///
    /// Same contract as [`cell`](Self::cell).
    #[inline]
    pub unsafe fn get(&self) -> P {
        unsafe { self.cell().get() }
    }

    /// Overwrite the element under the cursor.
    ///
    /// # Safety
    ///
    /// Same contract as [`cell`](Self::cell).
    #[inline]
    pub unsafe fn set(&self, value: P) {
        unsafe { self.cell().set(value) }
    }
}

impl<P: Pixel> Clone for PixelAccessor<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Pixel> Copy for PixelAccessor<'_, P> {}

impl<P: Pixel> PartialEq for PixelAccessor<'_, P> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ptr, other.ptr) && self.strides == other.strides
    }
}

impl<P: Pixel> fmt::Debug for PixelAccessor<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelAccessor")
            .field("ptr", &self.ptr)
            .field("strides", &self.strides)
            .finish()
    }
}
