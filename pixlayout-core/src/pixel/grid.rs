use ndarray::{Array2, ArrayView2, s};
use tracing::debug;

use crate::{
    analysis::{bbox::Bbox, labels::CategoryMap},
    consts::{BACKGROUND_ID, PIXEL_WORD_BITS},
    error::PixlayoutError,
    layout::element::BboxResolution,
};

/// Per-pixel label sets of one page, bit-packed into `u64` words.
///
/// The grid has shape `[height, width]`. Bit `k` of a pixel is set when class
/// `k` covers it; bit 0 is the background class.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelLabelGrid {
    cells: Array2<u64>,
}

impl PixelLabelGrid {
    /// A grid without any label, not even background.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            cells: Array2::zeros((height, width)),
        }
    }

    /// A grid where every pixel is background.
    pub fn all_background(width: usize, height: usize) -> Self {
        Self {
            cells: Array2::from_elem((height, width), 1u64 << BACKGROUND_ID),
        }
    }

    /// Rasterizes `(bit, bbox)` pairs.
    ///
    /// Every box is expanded outward to whole pixels (see
    /// [`Bbox::pixel_extent`]) and its bit is OR-ed into all covered pixels.
    /// With `set_background`, pixels left without any bit get the background
    /// bit afterwards.
    pub fn rasterize<I>(
        width: usize,
        height: usize,
        labeled_boxes: I,
        set_background: bool,
    ) -> Result<Self, PixlayoutError>
    where
        I: IntoIterator<Item = (usize, Bbox)>,
    {
        let mut grid = Self::empty(width, height);

        let mut num_boxes = 0usize;
        for (bit, bbox) in labeled_boxes {
            if bit >= PIXEL_WORD_BITS as usize {
                return Err(PixlayoutError::BitOutOfRange {
                    bit,
                    bits: PIXEL_WORD_BITS,
                });
            }

            let extent = bbox.pixel_extent(width, height);
            grid.cells
                .slice_mut(s![extent.rows, extent.cols])
                .mapv_inplace(|cell| cell | (1u64 << bit));
            num_boxes += 1;
        }

        if set_background {
            grid.cells
                .mapv_inplace(|cell| if cell == 0 { 1u64 << BACKGROUND_ID } else { cell });
        }

        debug!(
            "Rasterized {} boxes on a {}x{} grid",
            num_boxes, width, height
        );
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.cells.ncols()
    }

    pub fn height(&self) -> usize {
        self.cells.nrows()
    }

    /// `(height, width)` of the grid.
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn num_pixels(&self) -> usize {
        self.cells.len()
    }

    /// Label word of the pixel in row `y`, column `x`.
    pub fn get(&self, y: usize, x: usize) -> Option<u64> {
        self.cells.get((y, x)).copied()
    }

    pub fn view(&self) -> ArrayView2<'_, u64> {
        self.cells.view()
    }
}

/// Rasterizes a page's resolutions, translating caller category ids into
/// matrix bits through `categories`.
///
/// A category missing from the mapping is reported as
/// [`PixlayoutError::UnknownCategory`].
pub fn encode(
    width: usize,
    height: usize,
    resolutions: &[BboxResolution],
    categories: &CategoryMap,
    set_background: bool,
) -> Result<PixelLabelGrid, PixlayoutError> {
    let labeled_boxes = resolutions
        .iter()
        .map(|res| Ok((categories.matrix_id(res.category_id)?, res.bbox())))
        .collect::<Result<Vec<_>, PixlayoutError>>()?;

    PixelLabelGrid::rasterize(width, height, labeled_boxes, set_background)
}
