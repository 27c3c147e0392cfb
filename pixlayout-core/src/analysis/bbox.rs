use std::ops::Range;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box represented by minimum and maximum points.
///
/// Coordinates are page pixels with the origin at the top-left corner and are
/// never normalized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    /// The minimum point of the bounding box (top-left corner).
    pub min: DVec2,
    /// The maximum point of the bounding box (bottom-right corner).
    pub max: DVec2,
}

/// The half-open pixel ranges covered by a [`Bbox`] on a page grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelExtent {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl PixelExtent {
    /// Number of grid cells inside the extent.
    pub fn num_pixels(&self) -> usize {
        self.rows.len() * self.cols.len()
    }
}

impl Bbox {
    /// Creates a new bounding box from minimum and maximum points.
    ///
    /// # Example
    /// ```
    /// use glam::DVec2;
    /// use pixlayout_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::new(DVec2::new(0.0, 0.0), DVec2::new(10.0, 5.0));
    /// ```
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from `[x1, y1, x2, y2]` coordinates.
    ///
    /// # Example
    /// ```
    /// use glam::DVec2;
    /// use pixlayout_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_xyxy([1.0, 2.0, 6.0, 5.0]);
    /// assert_eq!(bbox.min, DVec2::new(1.0, 2.0));
    /// assert_eq!(bbox.max, DVec2::new(6.0, 5.0));
    /// ```
    pub fn from_xyxy(xyxy: [f64; 4]) -> Self {
        Self {
            min: DVec2::new(xyxy[0], xyxy[1]),
            max: DVec2::new(xyxy[2], xyxy[3]),
        }
    }

    /// Returns the box as `[x1, y1, x2, y2]`.
    pub fn xyxy(&self) -> [f64; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    /// Calculates the pixel cells covered by this box on a `width × height` grid.
    ///
    /// The start corner is floored and the end corner is ceiled, so a box never
    /// shrinks when it is rasterized: a box ending at `3.1` covers column `3`.
    /// The ranges are then bounded by the grid, which is the only clamping done.
    /// Boxes lying entirely outside the grid yield an empty extent.
    ///
    /// # Example
    /// ```
    /// use pixlayout_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_xyxy([1.0, 1.0, 3.1, 3.0]);
    /// let extent = bbox.pixel_extent(10, 12);
    /// assert_eq!(extent.cols, 1..4);
    /// assert_eq!(extent.rows, 1..3);
    /// assert_eq!(extent.num_pixels(), 6);
    /// ```
    pub fn pixel_extent(&self, width: usize, height: usize) -> PixelExtent {
        fn span(begin: f64, end: f64, limit: usize) -> Range<usize> {
            let begin = (begin.floor().max(0.0) as usize).min(limit);
            let end = (end.ceil().max(0.0) as usize).min(limit);
            begin..end.max(begin)
        }

        PixelExtent {
            rows: span(self.min.y, self.max.y, height),
            cols: span(self.min.x, self.max.x, width),
        }
    }
}
