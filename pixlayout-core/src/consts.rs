/// Matrix id reserved for the background class.
///
/// Row and column 0 of every confusion matrix belong to background, and bit 0 of
/// every pixel word flags a pixel that carries no other label.
pub const BACKGROUND_ID: usize = 0;

/// Display name of the background class.
pub const BACKGROUND_NAME: &str = "Background";

/// Name of the merged foreground class in the collapsed 2×2 view.
pub const ALL_COLLAPSED_CLASSES_NAME: &str = "all_classes";

/// Width of the pixel word used by [`crate::pixel::grid::PixelLabelGrid`].
pub const PIXEL_WORD_BITS: u32 = u64::BITS;

/// The number of caller categories a single pixel word can hold.
///
/// One bit of the 64-bit word is reserved for background, which leaves 63
/// bits for real layout categories.
pub const MAX_CATEGORIES: usize = PIXEL_WORD_BITS as usize - 1;

/// Absolute tolerance for the per-pattern contribution checks.
pub const CONTRIBUTION_TOLERANCE: f64 = 1e-9;

/// Default size of the page worker pool.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Number of histogram bins used for the per-page F1 statistics.
pub const STATS_HISTOGRAM_BINS: usize = 20;

/// File name of the JSON dataset evaluation written by the exporter.
pub const EVALUATION_JSON_FILENAME: &str = "evaluation_pixel_layout.json";
