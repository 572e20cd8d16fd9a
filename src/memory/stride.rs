//! Strided addressing: extents, strides and the coordinate-to-offset mapping.
//!
//! An element `(c, r, p)` lives at
//! `origin + c * strides.col + r * strides.row + p * strides.plane`,
//! measured in elements. Strides are signed and may be zero, which is how
//! flips, transposes and broadcasts are expressed over existing storage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of an image along its three logical axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent {
    /// Number of columns
    pub cols: usize,
    /// Number of rows
    pub rows: usize,
    /// Number of non-interleaved planes
    pub planes: usize,
}

impl Extent {
    /// Create a new extent.
    pub const fn new(cols: usize, rows: usize, planes: usize) -> Self {
        Self { cols, rows, planes }
    }

    /// Total number of elements, or `None` on overflow.
    pub fn volume(&self) -> Option<usize> {
        self.cols.checked_mul(self.rows)?.checked_mul(self.planes)
    }

    /// Check if any axis has zero length.
    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0 || self.planes == 0
    }

    /// Check if a coordinate lies inside this extent.
    #[inline]
    pub fn contains(&self, col: usize, row: usize, plane: usize) -> bool {
        col < self.cols && row < self.rows && plane < self.planes
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.cols, self.rows, self.planes)
    }
}

/// Per-axis element offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Strides {
    /// Offset per column step
    pub col: isize,
    /// Offset per row step
    pub row: isize,
    /// Offset per plane step
    pub plane: isize,
}

impl Strides {
    /// Create new strides.
    pub const fn new(col: isize, row: isize, plane: isize) -> Self {
        Self { col, row, plane }
    }

    /// Dense row-major, plane-major strides for `extent`.
    ///
    /// Saturates at `isize::MAX` for extents too large to address; use
    /// [`checked_canonical`](Self::checked_canonical) to detect that.
    pub fn canonical(extent: Extent) -> Self {
        Self::checked_canonical(extent).unwrap_or(Self {
            col: 1,
            row: isize::try_from(extent.cols).unwrap_or(isize::MAX),
            plane: isize::MAX,
        })
    }

    /// Dense strides for `extent`, or `None` if a plane does not fit in `isize`.
    pub fn checked_canonical(extent: Extent) -> Option<Self> {
        let row = isize::try_from(extent.cols).ok()?;
        let plane = isize::try_from(extent.rows).ok()?.checked_mul(row)?;
        Some(Self { col: 1, row, plane })
    }

    /// Relative offset of `(col, row, plane)`.
    #[inline]
    pub fn offset(&self, col: usize, row: usize, plane: usize) -> isize {
        col as isize * self.col + row as isize * self.row + plane as isize * self.plane
    }
}

/// Full addressing description of a view over a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Logical size
    pub extent: Extent,
    /// Element offset of `(0, 0, 0)` from the start of the buffer
    pub origin: isize,
    /// Per-axis element offsets
    pub strides: Strides,
}

impl Layout {
    /// Create a layout from its parts.
    pub const fn new(extent: Extent, origin: isize, strides: Strides) -> Self {
        Self {
            extent,
            origin,
            strides,
        }
    }

    /// The canonical dense layout for `extent`, starting at offset 0.
    pub fn canonical(extent: Extent) -> Self {
        Self::new(extent, 0, Strides::canonical(extent))
    }

    /// Absolute element offset of `(col, row, plane)`. Unchecked.
    #[inline]
    pub fn offset(&self, col: usize, row: usize, plane: usize) -> isize {
        self.origin + self.strides.offset(col, row, plane)
    }

    /// Absolute element index of an in-extent coordinate inside a buffer of `len` elements.
    #[inline]
    pub fn checked_index(&self, col: usize, row: usize, plane: usize, len: usize) -> Option<usize> {
        if !self.extent.contains(col, row, plane) {
            return None;
        }
        let offset = self.offset(col, row, plane);
        if offset < 0 || offset as usize >= len {
            return None;
        }
        Some(offset as usize)
    }

    /// Smallest and largest offsets reachable from in-extent coordinates.
    ///
    /// Returns `None` for an empty extent, or if the span overflows.
    pub fn span(&self) -> Option<(isize, isize)> {
        if self.extent.is_empty() {
            return None;
        }
        let mut lo = self.origin;
        let mut hi = self.origin;
        let axes = [
            (self.extent.cols, self.strides.col),
            (self.extent.rows, self.strides.row),
            (self.extent.planes, self.strides.plane),
        ];
        for (len, stride) in axes {
            let last = isize::try_from(len - 1).ok()?.checked_mul(stride)?;
            if last < 0 {
                lo = lo.checked_add(last)?;
            } else {
                hi = hi.checked_add(last)?;
            }
        }
        Some((lo, hi))
    }

    /// Check that every in-extent coordinate addresses an element of a `len`-element buffer.
    ///
    /// An empty extent fits anything.
    pub fn fits(&self, len: usize) -> bool {
        match self.span() {
            None => self.extent.is_empty(),
            Some((lo, hi)) => lo >= 0 && (hi as usize) < len,
        }
    }

    /// Check if this is the dense canonical layout starting at offset 0.
    pub fn is_canonical(&self) -> bool {
        self.origin == 0 && self.is_contiguous()
    }

    /// Check if elements are dense and in canonical order, wherever they start.
    pub fn is_contiguous(&self) -> bool {
        Strides::checked_canonical(self.extent).is_some_and(|dense| dense == self.strides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_strides() {
        let strides = Strides::canonical(Extent::new(4, 3, 2));
        assert_eq!(strides, Strides::new(1, 4, 12));
        assert_eq!(strides.offset(2, 1, 1), 2 + 4 + 12);
    }

    #[test]
    fn test_extent_volume_overflow() {
        assert_eq!(Extent::new(4, 3, 2).volume(), Some(24));
        assert_eq!(Extent::new(usize::MAX, 2, 1).volume(), None);
    }

    #[test]
    fn test_layout_span_negative_stride() {
        // Horizontally mirrored 4x3 image over a dense buffer.
        let layout = Layout::new(Extent::new(4, 3, 1), 3, Strides::new(-1, 4, 12));
        assert_eq!(layout.span(), Some((0, 11)));
        assert!(layout.fits(12));
        assert!(!layout.fits(11));
        assert_eq!(layout.offset(0, 0, 0), 3);
        assert_eq!(layout.offset(3, 2, 0), 8);
    }

    #[test]
    fn test_layout_zero_stride_broadcast() {
        let layout = Layout::new(Extent::new(2, 2, 5), 0, Strides::new(1, 2, 0));
        assert_eq!(layout.span(), Some((0, 3)));
        assert!(layout.fits(4));
        assert_eq!(layout.offset(1, 1, 4), 3);
    }

    #[test]
    fn test_layout_rejects_origin_before_buffer() {
        let layout = Layout::new(Extent::new(2, 1, 1), 0, Strides::new(-1, 2, 2));
        assert_eq!(layout.span(), Some((-1, 0)));
        assert!(!layout.fits(100));
    }

    #[test]
    fn test_checked_index() {
        let layout = Layout::canonical(Extent::new(4, 3, 1));
        assert_eq!(layout.checked_index(2, 1, 0, 12), Some(6));
        assert_eq!(layout.checked_index(4, 0, 0, 12), None);
        assert_eq!(layout.checked_index(0, 0, 1, 12), None);
    }

    #[test]
    fn test_empty_layout_fits() {
        let layout = Layout::default();
        assert!(layout.fits(0));
        assert!(layout.is_canonical());
    }

    #[test]
    fn test_huge_broadcast_is_not_contiguous() {
        let extent = Extent::new(usize::MAX / 2, 4, 1);
        assert_eq!(Strides::checked_canonical(extent), None);

        let layout = Layout::new(extent, 0, Strides::new(0, 0, 0));
        assert!(layout.fits(1));
        assert!(!layout.is_contiguous());
        assert!(!layout.is_canonical());
        assert_eq!(Strides::canonical(extent).plane, isize::MAX);
    }

    #[test]
    fn test_extent_display() {
        assert_eq!(Extent::new(4, 3, 1).to_string(), "4x3x1");
    }
}
