//! Zero-copy reinterpretations of an existing view.
//!
//! Every operation here returns a new [`ImageView`] sharing the same buffer
//! with a different layout: crops move the origin, flips negate a stride,
//! transposes swap strides, broadcasts use a zero stride. No pixel data is
//! copied and writes through the result are visible through the original.

use crate::core::error::{ViewError, ViewResult};
use crate::core::pixel::Pixel;
use crate::memory::stride::{Extent, Layout, Strides};
use crate::view::image_view::ImageView;

impl<P: Pixel> ImageView<P> {
    /// A view of the same buffer under an arbitrary layout.
    ///
    /// Fails with `InvalidLayout` if any in-extent coordinate of `layout`
    /// would address memory outside the buffer.
    pub fn with_layout(&self, layout: Layout) -> ViewResult<Self> {
        let len = self.data.as_ref().map_or(0, |buffer| buffer.len());
        if !layout.fits(len) {
            return Err(ViewError::InvalidLayout {
                reason: format!(
                    "extent {} at origin {} with strides ({}, {}, {}) exceeds a buffer of {} elements",
                    layout.extent,
                    layout.origin,
                    layout.strides.col,
                    layout.strides.row,
                    layout.strides.plane,
                    len
                ),
            });
        }
        Ok(self.relayout(layout))
    }

    /// Install a layout already known to fit the buffer.
    fn relayout(&self, layout: Layout) -> Self {
        debug_assert!(layout.fits(self.data.as_ref().map_or(0, |b| b.len())));
        Self {
            data: if layout.extent.is_empty() {
                None
            } else {
                self.data.clone()
            },
            layout,
        }
    }

    /// A rectangular window of every plane, starting at `(col, row)`.
    pub fn crop(&self, col: usize, row: usize, cols: usize, rows: usize) -> ViewResult<Self> {
        let fits_cols = col.checked_add(cols).is_some_and(|end| end <= self.cols());
        let fits_rows = row.checked_add(rows).is_some_and(|end| end <= self.rows());
        if !fits_cols || !fits_rows {
            return Err(ViewError::Argument(format!(
                "crop {}x{} at ({}, {}) exceeds a {} view",
                cols,
                rows,
                col,
                row,
                self.extent()
            )));
        }

        let extent = Extent::new(cols, rows, self.planes());
        let origin = if extent.is_empty() {
            0
        } else {
            self.layout.offset(col, row, 0)
        };
        Ok(self.relayout(Layout::new(extent, origin, self.layout.strides)))
    }

    /// Mirror left to right.
    pub fn flip_horizontal(&self) -> Self {
        if self.extent().is_empty() {
            return self.clone();
        }
        let strides = self.layout.strides;
        self.relayout(Layout::new(
            self.extent(),
            self.layout.offset(self.cols() - 1, 0, 0),
            Strides::new(-strides.col, strides.row, strides.plane),
        ))
    }

    /// Mirror top to bottom.
    pub fn flip_vertical(&self) -> Self {
        if self.extent().is_empty() {
            return self.clone();
        }
        let strides = self.layout.strides;
        self.relayout(Layout::new(
            self.extent(),
            self.layout.offset(0, self.rows() - 1, 0),
            Strides::new(strides.col, -strides.row, strides.plane),
        ))
    }

    /// Swap columns and rows.
    pub fn transpose(&self) -> Self {
        let extent = self.extent();
        let strides = self.layout.strides;
        self.relayout(Layout::new(
            Extent::new(extent.rows, extent.cols, extent.planes),
            self.layout.origin,
            Strides::new(strides.row, strides.col, strides.plane),
        ))
    }

    /// A single-plane view of plane `plane`.
    pub fn select_plane(&self, plane: usize) -> ViewResult<Self> {
        if plane >= self.planes() {
            return Err(ViewError::Argument(format!(
                "plane {} does not exist in a {} view",
                plane,
                self.extent()
            )));
        }
        let extent = Extent::new(self.cols(), self.rows(), 1);
        let origin = if extent.is_empty() {
            0
        } else {
            self.layout.offset(0, 0, plane)
        };
        Ok(self.relayout(Layout::new(extent, origin, self.layout.strides)))
    }

    /// Present a single-plane view as `planes` identical planes.
    pub fn broadcast_planes(&self, planes: usize) -> ViewResult<Self> {
        if self.planes() != 1 {
            return Err(ViewError::PlaneMismatch {
                expected: 1,
                got: self.planes(),
            });
        }
        let strides = self.layout.strides;
        Ok(self.relayout(Layout::new(
            Extent::new(self.cols(), self.rows(), planes),
            self.layout.origin,
            Strides::new(strides.col, strides.row, 0),
        )))
    }

    /// Keep every `col_step`-th column and `row_step`-th row, starting at `(0, 0)`.
    ///
    /// A step at least as long as its axis keeps a single line.
    pub fn subsample(&self, col_step: usize, row_step: usize) -> ViewResult<Self> {
        if col_step == 0 || row_step == 0 {
            return Err(ViewError::Argument(format!(
                "subsample steps must be positive, got ({}, {})",
                col_step, row_step
            )));
        }
        let col_step = col_step.min(self.cols().max(1));
        let row_step = row_step.min(self.rows().max(1));
        let extent = Extent::new(
            self.cols().div_ceil(col_step),
            self.rows().div_ceil(row_step),
            self.planes(),
        );

        let strides = self.layout.strides;
        let scaled = |stride: isize, step: usize| {
            isize::try_from(step).ok().and_then(|step| stride.checked_mul(step))
        };
        let (col, row) = match (scaled(strides.col, col_step), scaled(strides.row, row_step)) {
            (Some(col), Some(row)) => (col, row),
            _ => {
                return Err(ViewError::InvalidLayout {
                    reason: format!(
                        "subsample steps ({}, {}) overflow strides ({}, {})",
                        col_step, row_step, strides.col, strides.row
                    ),
                })
            }
        };
        Ok(self.relayout(Layout::new(
            extent,
            self.layout.origin,
            Strides::new(col, row, strides.plane),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x3 view with value `c + 10 * r`.
    fn ramp() -> ImageView<i32> {
        let view = ImageView::with_size(4, 3, 1).unwrap();
        for r in 0..3 {
            for c in 0..4 {
                view[(c, r)].set((c + 10 * r) as i32);
            }
        }
        view
    }

    #[test]
    fn test_crop_aliases() {
        let view = ramp();
        let crop = view.crop(1, 1, 2, 2).unwrap();
        assert_eq!(crop.extent(), Extent::new(2, 2, 1));
        assert_eq!(crop.to_vec(), vec![11, 12, 21, 22]);
        assert!(crop.shares_buffer_with(&view));

        crop[(0, 0)].set(-1);
        assert_eq!(view[(1, 1)].get(), -1);
    }

    #[test]
    fn test_crop_out_of_range() {
        let view = ramp();
        assert!(view.crop(3, 0, 2, 1).is_err());
        assert!(view.crop(0, usize::MAX, 1, 2).is_err());
        let empty = view.crop(4, 3, 0, 0).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_flips() {
        let view = ramp();
        let h = view.flip_horizontal();
        assert_eq!(h.strides().col, -1);
        assert_eq!(h[(0, 0)].get(), 3);
        assert_eq!(h[(3, 2)].get(), 20);

        let v = view.flip_vertical();
        assert_eq!(v[(0, 0)].get(), 20);
        assert_eq!(v.flip_vertical().to_vec(), view.to_vec());
    }

    #[test]
    fn test_transpose() {
        let view = ramp();
        let t = view.transpose();
        assert_eq!(t.extent(), Extent::new(3, 4, 1));
        assert_eq!(t[(2, 1)].get(), 21);
        assert_eq!(t.transpose().to_vec(), view.to_vec());
    }

    #[test]
    fn test_select_and_broadcast_planes() {
        let view = ImageView::<u8>::with_size(2, 2, 3).unwrap();
        view[(1, 1, 2)].set(7);
        let plane = view.select_plane(2).unwrap();
        assert_eq!(plane.planes(), 1);
        assert_eq!(plane[(1, 1)].get(), 7);
        assert!(view.select_plane(3).is_err());

        let wide = plane.broadcast_planes(4).unwrap();
        assert_eq!(wide.planes(), 4);
        assert_eq!(wide.strides().plane, 0);
        assert_eq!(wide[(1, 1, 3)].get(), 7);
        assert!(view.broadcast_planes(2).is_err());
    }

    #[test]
    fn test_subsample() {
        let view = ramp();
        let half = view.subsample(2, 2).unwrap();
        assert_eq!(half.extent(), Extent::new(2, 2, 1));
        assert_eq!(half.to_vec(), vec![0, 2, 20, 22]);
        assert!(view.subsample(0, 1).is_err());
    }

    #[test]
    fn test_huge_broadcast_view_is_not_contiguous() {
        let view = ramp();
        let layout = Layout::new(Extent::new(usize::MAX / 2, 4, 1), 0, Strides::new(0, 0, 0));
        let broadcast = view.with_layout(layout).unwrap();
        assert!(!broadcast.is_contiguous());
        assert_eq!(broadcast.pixel(usize::MAX / 2 - 1, 3, 0).map(|cell| cell.get()), Some(0));
    }

    #[test]
    fn test_subsample_huge_step_keeps_one_line() {
        let view = ramp();
        let t = view.transpose();
        assert_eq!(t.strides().col, 4);

        let first_row = t.subsample(isize::MAX as usize, 1).unwrap();
        assert_eq!(first_row.extent(), Extent::new(1, 4, 1));
        assert_eq!(first_row.to_vec(), vec![0, 1, 2, 3]);

        let corner = view.subsample(usize::MAX, usize::MAX).unwrap();
        assert_eq!(corner.extent(), Extent::new(1, 1, 1));
        assert_eq!(corner[(0, 0)].get(), 0);
    }

    #[test]
    fn test_with_layout_validates() {
        let view = ramp();
        let bad = Layout::new(Extent::new(4, 4, 1), 0, Strides::new(1, 4, 16));
        assert!(matches!(
            view.with_layout(bad),
            Err(ViewError::InvalidLayout { .. })
        ));

        let mirrored = Layout::new(Extent::new(4, 3, 1), 11, Strides::new(-1, -4, 0));
        let rotated = view.with_layout(mirrored).unwrap();
        assert_eq!(rotated[(0, 0)].get(), 23);
        assert_eq!(rotated[(3, 2)].get(), 0);
    }

    #[test]
    fn test_reviews_share_refcount() {
        let view = ramp();
        let _a = view.flip_horizontal();
        let _b = view.transpose();
        assert_eq!(view.ref_count(), 3);
    }
}
