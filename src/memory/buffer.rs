//! Reference-counted element storage shared by image views.
//!
//! A [`Buffer`] is a cheap handle: cloning it shares the same allocation and
//! bumps a single-threaded reference count. Storage is released when the
//! last handle is dropped. Elements live in [`Cell`]s so that every view
//! sharing the allocation observes in-place writes made through any other.

use crate::core::error::{ViewError, ViewResult};
use crate::core::pixel::Pixel;
use std::cell::Cell;
use std::rc::Rc;

/// Shared, default-initialized storage for `count` pixels.
pub(crate) struct Buffer<P: Pixel> {
    cells: Rc<Box<[Cell<P>]>>,
}

impl<P: Pixel> Buffer<P> {
    /// Allocate `count` default-initialized elements.
    ///
    /// Allocation failure is reported, not retried.
    pub(crate) fn allocate(count: usize) -> ViewResult<Self> {
        let mut cells: Vec<Cell<P>> = Vec::new();
        cells
            .try_reserve_exact(count)
            .map_err(|_| ViewError::Allocation {
                count,
                bytes: count.saturating_mul(std::mem::size_of::<P>()),
            })?;
        cells.resize_with(count, || Cell::new(P::default()));
        Ok(Self {
            cells: Rc::new(cells.into_boxed_slice()),
        })
    }

    /// Number of elements in the allocation.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    /// Address of element 0.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *const Cell<P> {
        self.cells.as_ptr()
    }

    /// The whole allocation.
    #[inline]
    pub(crate) fn cells(&self) -> &[Cell<P>] {
        &self.cells
    }

    /// Number of handles currently sharing this allocation.
    pub(crate) fn ref_count(&self) -> usize {
        Rc::strong_count(&self.cells)
    }

    /// Check if two handles share one allocation.
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }
}

impl<P: Pixel> Clone for Buffer<P> {
    fn clone(&self) -> Self {
        Self {
            cells: Rc::clone(&self.cells),
        }
    }
}
