use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::STATS_HISTOGRAM_BINS;

/// Summary of per-page scores over a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub total: usize,
    /// `-1` for an empty dataset.
    pub mean: f64,
    /// `-1` for an empty dataset.
    pub median: f64,
    /// Sample standard deviation, `0` with fewer than two values.
    pub std: f64,
    /// `hist.len() + 1` bin edges.
    pub bins: Vec<f64>,
    pub hist: Vec<usize>,
}

impl DatasetStatistics {
    /// Statistics of scores in `[0, 1]` over the default number of bins.
    pub fn from_scores(values: &[f64]) -> Self {
        compute_stats(values, true, STATS_HISTOGRAM_BINS)
    }
}

/// Computes the statistics of `values`.
///
/// The histogram spans `[0, 1]`, or `[0, max(values)]` when
/// `max_value_is_one` is false. Its last bin is closed on the right and values
/// outside the range are not counted.
pub fn compute_stats(values: &[f64], max_value_is_one: bool, num_bins: usize) -> DatasetStatistics {
    let total = values.len();

    let (mean, median) = if values.is_empty() {
        (-1.0, -1.0)
    } else {
        (values.iter().sum::<f64>() / total as f64, median(values))
    };

    let std = if total > 1 {
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (total - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };
    debug!(
        "Compute statistics: total: {}, mean: {}, median: {}, std: {}",
        total, mean, median, std
    );

    let max_value = if max_value_is_one || values.is_empty() {
        1.0
    } else {
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    };
    let (bins, hist) = histogram(values, 0.0, max_value, num_bins);

    DatasetStatistics {
        total,
        mean,
        median,
        std,
        bins,
        hist,
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn histogram(values: &[f64], low: f64, high: f64, num_bins: usize) -> (Vec<f64>, Vec<usize>) {
    // A degenerate range is widened by half a unit on both sides
    let (low, high) = if high > low {
        (low, high)
    } else {
        (low - 0.5, high + 0.5)
    };

    let width = (high - low) / num_bins as f64;
    let bins: Vec<f64> = (0..=num_bins).map(|i| low + width * i as f64).collect();

    let mut hist = vec![0usize; num_bins];
    if num_bins == 0 {
        return (bins, hist);
    }
    for &value in values {
        if !(low..=high).contains(&value) {
            continue;
        }
        let index = (((value - low) / (high - low)) * num_bins as f64) as usize;
        hist[index.min(num_bins - 1)] += 1;
    }
    (bins, hist)
}
