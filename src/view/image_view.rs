//! The standard in-memory image container.
//!
//! An [`ImageView`] does not hold pixels itself but a shared handle to a
//! reference-counted buffer plus a strided layout describing how to address
//! it. Cloning a view is a shallow O(1) operation: both views alias the same
//! pixels and observe each other's writes until one of them is resized, at
//! which point it detaches onto fresh storage.
//!
//! Views are single-threaded: the reference count is not atomic and the type
//! is neither `Send` nor `Sync`. Writes go through `&self` because pixels are
//! stored in [`Cell`]s.

use crate::core::error::{ViewError, ViewResult};
use crate::core::pixel::Pixel;
use crate::core::traits::{Capabilities, Resizable};
use crate::memory::accessor::PixelAccessor;
use crate::memory::buffer::Buffer;
use crate::memory::stride::{Extent, Layout, Strides};
use crate::raster::protocol::{self, check_extent, ImageSink, ImageSource};
use log::debug;
use std::cell::Cell;
use std::fmt;
use std::ops::Index;

/// A shareable, resizable view onto strided pixel storage.
pub struct ImageView<P: Pixel> {
    pub(crate) data: Option<Buffer<P>>,
    pub(crate) layout: Layout,
}

impl<P: Pixel> ImageView<P> {
    /// Create an empty view with zero extent and no storage.
    pub fn new() -> Self {
        Self {
            data: None,
            layout: Layout::default(),
        }
    }

    /// Create a view with fresh, default-initialized storage.
    pub fn with_size(cols: usize, rows: usize, planes: usize) -> ViewResult<Self> {
        let mut view = Self::new();
        view.set_size(cols, rows, planes)?;
        Ok(view)
    }

    /// Create a view sized like `src` and rasterize `src` into it.
    pub fn from_source<S>(src: &S) -> ViewResult<Self>
    where
        S: ImageSource<Pixel = P> + ?Sized,
    {
        let mut view = Self::new();
        view.assign(src)?;
        Ok(view)
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.layout.extent.cols
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.layout.extent.rows
    }

    /// Number of planes.
    #[inline]
    pub fn planes(&self) -> usize {
        self.layout.extent.planes
    }

    /// The full extent.
    #[inline]
    pub fn extent(&self) -> Extent {
        self.layout.extent
    }

    /// Per-axis element strides.
    #[inline]
    pub fn strides(&self) -> Strides {
        self.layout.strides
    }

    /// The complete addressing description.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Check if the view has no storage.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Check if pixels are dense and in canonical order.
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Release the storage handle and return to the empty state.
    pub fn reset(&mut self) {
        self.data = None;
        self.layout = Layout::default();
    }

    /// Adjust the extent, allocating fresh storage if it changed.
    ///
    /// When the extent is unchanged this is a no-op and the data is kept.
    /// Otherwise the view detaches from its current buffer (other views
    /// sharing it are unaffected), allocates `cols * rows * planes`
    /// default-initialized elements and resets to canonical strides. On
    /// failure the view is left untouched.
    pub fn set_size(&mut self, cols: usize, rows: usize, planes: usize) -> ViewResult<()> {
        let extent = Extent::new(cols, rows, planes);
        if extent == self.layout.extent {
            return Ok(());
        }

        let count = extent
            .volume()
            .filter(|&n| isize::try_from(n).is_ok())
            .ok_or(ViewError::ExtentOverflow { extent })?;

        let data = if count == 0 {
            None
        } else {
            Some(Buffer::allocate(count)?)
        };

        debug!(
            "ImageView: resize {} -> {} ({} elements, released buffer shared by {})",
            self.layout.extent,
            extent,
            count,
            self.ref_count()
        );

        self.data = data;
        self.layout = Layout::canonical(extent);
        Ok(())
    }

    /// Adjust the extent to match another source.
    pub fn set_size_like<S: ImageSource + ?Sized>(&mut self, other: &S) -> ViewResult<()> {
        self.set_size(other.cols(), other.rows(), other.planes())
    }

    /// Resize to the extent of `src`, then rasterize `src` into this view.
    ///
    /// This is the only way computed or decoded data becomes owned storage.
    /// As with [`rasterize_from`](Self::rasterize_from), a source that
    /// overlaps this view's storage under a different layout (such as
    /// `self.flip_horizontal()`) produces unspecified pixel values; pass it
    /// through [`materialize`](crate::raster::materialize::materialize) first.
    pub fn assign<S>(&mut self, src: &S) -> ViewResult<()>
    where
        S: ImageSource<Pixel = P> + ?Sized,
    {
        protocol::assign(self, src)
    }

    /// Rasterize `src` into the existing storage without resizing.
    ///
    /// The extents must match. `src` may be this view itself or another view
    /// of the same storage with the same layout; sources overlapping the
    /// storage under a different layout produce unspecified pixel values.
    pub fn rasterize_from<S>(&self, src: &S) -> ViewResult<()>
    where
        S: ImageSource<Pixel = P> + ?Sized,
    {
        let mut sink = self.clone();
        src.rasterize(&mut sink)
    }

    /// A cursor positioned at `(0, 0)` of plane 0.
    pub fn origin(&self) -> PixelAccessor<'_, P> {
        let base = match &self.data {
            Some(buffer) => buffer.as_ptr(),
            None => std::ptr::null(),
        };
        PixelAccessor::new(base.wrapping_offset(self.layout.origin), self.layout.strides)
    }

    /// Address of element `(0, 0, 0)`, or null for an empty view.
    ///
    /// Valid only while this view is alive and has not been resized.
    pub fn data(&self) -> *mut P {
        match &self.data {
            Some(_) => self.origin().as_ptr().cast::<P>().cast_mut(),
            None => std::ptr::null_mut(),
        }
    }

    /// The element at `(col, row, plane)`, or `None` outside the extent.
    #[inline]
    pub fn pixel(&self, col: usize, row: usize, plane: usize) -> Option<&Cell<P>> {
        if !self.layout.extent.contains(col, row, plane) {
            return None;
        }
        let buffer = self.data.as_ref()?;
        let offset = self.layout.offset(col, row, plane);
        // SAFETY: every layout installed on a view fits its buffer, so an
        // in-extent coordinate always maps inside the allocation.
        Some(unsafe { buffer.cells().get_unchecked(offset as usize) })
    }

    /// Read the pixel at `(col, row, plane)`, or `None` outside the extent.
    #[inline]
    pub fn get(&self, col: usize, row: usize, plane: usize) -> Option<P> {
        self.pixel(col, row, plane).map(Cell::get)
    }

    /// Store `value` at `(col, row, plane)` and return the previous value,
    /// or `None` (and store nothing) outside the extent.
    #[inline]
    pub fn set(&self, col: usize, row: usize, plane: usize, value: P) -> Option<P> {
        self.pixel(col, row, plane).map(|cell| cell.replace(value))
    }

    /// The element at `(col, row, plane)` without any range check.
    ///
    /// # Safety
    ///
    /// The view must be non-empty and the coordinate must address an element
    /// of its buffer; anything else is undefined behavior.
    #[inline]
    pub unsafe fn pixel_unchecked(&self, col: usize, row: usize, plane: usize) -> &Cell<P> {
        let base = match &self.data {
            Some(buffer) => buffer.as_ptr(),
            None => std::hint::unreachable_unchecked(),
        };
        &*base.offset(self.layout.offset(col, row, plane))
    }

    /// Check if two views share one buffer.
    pub fn shares_buffer_with(&self, other: &ImageView<P>) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Number of views (including this one) sharing the buffer; 0 when empty.
    pub fn ref_count(&self) -> usize {
        self.data.as_ref().map_or(0, Buffer::ref_count)
    }

    /// Visit every element in canonical order with an accessor walk.
    fn for_each_cell<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize, usize, &Cell<P>),
    {
        if self.data.is_none() {
            return;
        }
        let Extent { cols, rows, planes } = self.layout.extent;

        let mut plane_acc = self.origin();
        for plane in 0..planes {
            let mut row_acc = plane_acc;
            for row in 0..rows {
                let mut col_acc = row_acc;
                for col in 0..cols {
                    // SAFETY: (col, row, plane) is in extent and the layout fits the buffer.
                    f(col, row, plane, unsafe { col_acc.cell() });
                    col_acc.next_col();
                }
                row_acc.next_row();
            }
            plane_acc.next_plane();
        }
    }

    /// Set every element to `value`.
    pub fn fill(&self, value: P) {
        self.for_each_cell(|_, _, _, cell| cell.set(value));
    }

    /// Iterate over pixel values in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = P> + '_ {
        let Extent { cols, rows, planes } = self.layout.extent;
        (0..planes).flat_map(move |plane| {
            (0..rows).flat_map(move |row| {
                (0..cols).filter_map(move |col| self.get(col, row, plane))
            })
        })
    }

    /// Copy pixel values out in canonical order.
    pub fn to_vec(&self) -> Vec<P> {
        let mut out = Vec::with_capacity(self.layout.extent.volume().unwrap_or(0));
        self.for_each_cell(|_, _, _, cell| out.push(cell.get()));
        out
    }
}

impl<P: Pixel> Default for ImageView<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shallow copy: shares the buffer and duplicates the layout.
impl<P: Pixel> Clone for ImageView<P> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            layout: self.layout,
        }
    }
}

impl<P: Pixel> fmt::Debug for ImageView<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageView")
            .field("extent", &self.layout.extent)
            .field("origin", &self.layout.origin)
            .field("strides", &self.layout.strides)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl<P: Pixel> Index<(usize, usize)> for ImageView<P> {
    type Output = Cell<P>;

    fn index(&self, (col, row): (usize, usize)) -> &Cell<P> {
        &self[(col, row, 0usize)]
    }
}

impl<P: Pixel> Index<(usize, usize, usize)> for ImageView<P> {
    type Output = Cell<P>;

    fn index(&self, (col, row, plane): (usize, usize, usize)) -> &Cell<P> {
        match self.pixel(col, row, plane) {
            Some(cell) => cell,
            None => panic!(
                "pixel ({}, {}, {}) is outside a {} view",
                col, row, plane, self.layout.extent
            ),
        }
    }
}

impl<P: Pixel> ImageSource for ImageView<P> {
    type Pixel = P;
    const CAPABILITIES: Capabilities = Capabilities::MATERIALIZED;

    fn cols(&self) -> usize {
        self.layout.extent.cols
    }

    fn rows(&self) -> usize {
        self.layout.extent.rows
    }

    fn planes(&self) -> usize {
        self.layout.extent.planes
    }

    #[inline]
    fn pixel(&self, col: usize, row: usize, plane: usize) -> P {
        self[(col, row, plane)].get()
    }

    fn rasterize<D>(&self, dest: &mut D) -> ViewResult<()>
    where
        D: ImageSink<Pixel = P> + ?Sized,
    {
        check_extent(self.extent(), dest.extent())?;
        self.for_each_cell(|col, row, plane, cell| dest.put(col, row, plane, cell.get()));
        Ok(())
    }
}

impl<P: Pixel> ImageSink for ImageView<P> {
    type Pixel = P;

    fn cols(&self) -> usize {
        self.layout.extent.cols
    }

    fn rows(&self) -> usize {
        self.layout.extent.rows
    }

    fn planes(&self) -> usize {
        self.layout.extent.planes
    }

    #[inline]
    fn put(&mut self, col: usize, row: usize, plane: usize, value: P) {
        self[(col, row, plane)].set(value);
    }
}

impl<P: Pixel> Resizable for ImageView<P> {
    fn set_size(&mut self, cols: usize, rows: usize, planes: usize) -> ViewResult<()> {
        ImageView::set_size(self, cols, rows, planes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let view = ImageView::<i32>::new();
        assert!(view.is_empty());
        assert_eq!(view.extent(), Extent::default());
        assert_eq!(view.ref_count(), 0);
        assert!(view.data().is_null());
    }

    #[test]
    fn test_set_size_zero_fills_and_canonicalizes() {
        let view = ImageView::<i32>::with_size(4, 3, 2).unwrap();
        assert_eq!(view.strides(), Strides::new(1, 4, 12));
        assert!(view.layout().is_canonical());
        assert!(view.iter().all(|v| v == 0));
        assert_eq!(view.to_vec().len(), 24);
    }

    #[test]
    fn test_set_size_same_extent_keeps_data() {
        let mut view = ImageView::<u8>::with_size(2, 2, 1).unwrap();
        view[(1, 1)].set(5);
        view.set_size(2, 2, 1).unwrap();
        assert_eq!(view[(1, 1)].get(), 5);
    }

    #[test]
    fn test_zero_volume_has_no_buffer() {
        let view = ImageView::<f32>::with_size(0, 5, 1).unwrap();
        assert!(view.is_empty());
        assert_eq!(view.rows(), 5);
        assert_eq!(view.get(0, 0, 0), None);
    }

    #[test]
    fn test_extent_overflow() {
        let mut view = ImageView::<u8>::new();
        let error = view.set_size(usize::MAX, 2, 1).unwrap_err();
        assert!(matches!(error, ViewError::ExtentOverflow { .. }));
        assert!(view.is_empty());
    }

    #[test]
    fn test_allocation_failure_keeps_old_storage() {
        let mut view = ImageView::<u64>::with_size(2, 2, 1).unwrap();
        view[(1, 1)].set(9);

        let error = view.set_size(usize::MAX / 64, 1, 1).unwrap_err();
        assert!(matches!(error, ViewError::Allocation { .. }));
        assert!(error.is_fatal());
        assert_eq!(view.extent(), Extent::new(2, 2, 1));
        assert_eq!(view[(1, 1)].get(), 9);
    }

    #[test]
    fn test_clone_aliases_until_resize() {
        let mut a = ImageView::<i32>::with_size(3, 3, 1).unwrap();
        let b = a.clone();
        assert!(a.shares_buffer_with(&b));
        assert_eq!(a.ref_count(), 2);

        a[(0, 2)].set(-4);
        assert_eq!(b[(0, 2)].get(), -4);

        a.set_size(1, 1, 1).unwrap();
        assert!(!a.shares_buffer_with(&b));
        assert_eq!(b.ref_count(), 1);
        assert_eq!(b[(0, 2)].get(), -4);
    }

    #[test]
    fn test_reset() {
        let mut view = ImageView::<u16>::with_size(2, 2, 1).unwrap();
        let keep = view.clone();
        view.reset();
        assert!(view.is_empty());
        assert_eq!(keep.ref_count(), 1);
    }

    #[test]
    fn test_checked_access() {
        let view = ImageView::<u8>::with_size(2, 2, 1).unwrap();
        assert!(view.pixel(1, 1, 0).is_some());
        assert!(view.pixel(2, 0, 0).is_none());
        assert!(view.pixel(0, 0, 1).is_none());

        assert_eq!(view.set(1, 0, 0, 4), Some(0));
        assert_eq!(view.set(1, 0, 0, 5), Some(4));
        assert_eq!(view.get(1, 0, 0), Some(5));
        assert_eq!(view.set(0, 2, 0, 1), None);
    }

    #[test]
    #[should_panic(expected = "outside a 2x2x1 view")]
    fn test_index_out_of_range_panics() {
        let view = ImageView::<u8>::with_size(2, 2, 1).unwrap();
        let _ = view[(2, 0)].get();
    }

    #[test]
    fn test_unchecked_matches_checked() {
        let view = ImageView::<i64>::with_size(3, 2, 2).unwrap();
        view[(2, 1, 1)].set(77);
        let cell = unsafe { view.pixel_unchecked(2, 1, 1) };
        assert_eq!(cell.get(), 77);
    }

    #[test]
    fn test_data_points_at_origin() {
        let view = ImageView::<u32>::with_size(2, 2, 1).unwrap();
        view[(0, 0)].set(11);
        let ptr = view.data();
        assert!(!ptr.is_null());
        assert_eq!(unsafe { *ptr }, 11);
    }

    #[test]
    fn test_origin_accessor_walk() {
        let view = ImageView::<u8>::with_size(3, 2, 1).unwrap();
        view[(2, 1)].set(8);
        let mut acc = view.origin();
        acc.next_row().next_col().next_col();
        assert_eq!(unsafe { acc.get() }, 8);
    }

    #[test]
    fn test_fill_and_to_vec_order() {
        let view = ImageView::<u8>::with_size(2, 1, 2).unwrap();
        view.fill(3);
        view[(1, 0, 1)].set(9);
        assert_eq!(view.to_vec(), vec![3, 3, 3, 9]);
        assert_eq!(view.iter().collect::<Vec<_>>(), view.to_vec());
    }

    #[test]
    fn test_rasterize_from_self_is_idempotent() {
        let view = ImageView::<u8>::with_size(3, 2, 1).unwrap();
        for (i, v) in [1u8, 2, 3, 4, 5, 6].into_iter().enumerate() {
            view[(i % 3, i / 3)].set(v);
        }
        let before = view.to_vec();
        view.rasterize_from(&view).unwrap();
        assert_eq!(view.to_vec(), before);
    }

    #[test]
    fn test_rasterize_from_requires_matching_extent() {
        let a = ImageView::<u8>::with_size(2, 2, 1).unwrap();
        let b = ImageView::<u8>::with_size(3, 2, 1).unwrap();
        assert!(matches!(
            a.rasterize_from(&b),
            Err(ViewError::ExtentMismatch { .. })
        ));
    }

    #[test]
    fn test_assign_detaches_and_copies() {
        let src = ImageView::<u8>::with_size(2, 2, 1).unwrap();
        src[(1, 0)].set(4);

        let mut dst = ImageView::<u8>::new();
        dst.assign(&src).unwrap();
        assert!(!dst.shares_buffer_with(&src));
        assert_eq!(dst[(1, 0)].get(), 4);

        src[(1, 0)].set(5);
        assert_eq!(dst[(1, 0)].get(), 4);
    }

    #[test]
    fn test_assign_overlapping_source_through_materialize() {
        use crate::raster::materialize::materialize;

        let mut view = ImageView::<u8>::with_size(4, 1, 1).unwrap();
        for c in 0..4 {
            view[(c, 0)].set(c as u8);
        }
        let mirrored = materialize(&view.flip_horizontal()).unwrap();
        view.assign(&mirrored).unwrap();
        assert_eq!(view.to_vec(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_capabilities() {
        assert_eq!(
            <ImageView<u8> as ImageSource>::CAPABILITIES,
            Capabilities::MATERIALIZED
        );
    }
}
