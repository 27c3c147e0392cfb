use rayon::prelude::*;
use tracing::debug;

use crate::{error::PixlayoutError, pixel::grid::PixelLabelGrid};

/// Unique `(ground truth, prediction)` pixel-word pairs of a page with their
/// multiplicities.
///
/// The three vectors are aligned and sorted by `(gt, pred)`. Every pair occurs
/// once, every count is positive, and the counts sum to the number of pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedPairs {
    pub gt: Vec<u64>,
    pub pred: Vec<u64>,
    pub counts: Vec<u64>,
}

impl CompressedPairs {
    /// Number of unique pairs.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of pixels represented by the pairs.
    pub fn num_pixels(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterates over `(gt, pred, count)` triples in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64, u64)> + '_ {
        self.gt
            .iter()
            .zip(&self.pred)
            .zip(&self.counts)
            .map(|((&g, &p), &c)| (g, p, c))
    }
}

/// Collapses two equally sized grids into their unique pixel pairs.
pub fn compress(
    gt: &PixelLabelGrid,
    pred: &PixelLabelGrid,
) -> Result<CompressedPairs, PixlayoutError> {
    if gt.shape() != pred.shape() {
        return Err(PixlayoutError::GridMismatch {
            stage: "compress".to_string(),
            left: gt.shape(),
            right: pred.shape(),
        });
    }

    let mut pairs: Vec<(u64, u64)> = gt
        .view()
        .iter()
        .zip(pred.view().iter())
        .map(|(&g, &p)| (g, p))
        .collect();
    pairs.par_sort_unstable();

    let mut compressed = CompressedPairs::default();
    for (g, p) in pairs {
        match (compressed.gt.last(), compressed.pred.last()) {
            (Some(&last_g), Some(&last_p)) if last_g == g && last_p == p => {
                if let Some(count) = compressed.counts.last_mut() {
                    *count += 1;
                }
            }
            _ => {
                compressed.gt.push(g);
                compressed.pred.push(p);
                compressed.counts.push(1);
            }
        }
    }

    debug!(
        "Compressed {} pixels into {} unique pairs",
        gt.num_pixels(),
        compressed.len()
    );
    Ok(compressed)
}
