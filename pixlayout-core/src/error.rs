use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PixlayoutError {
    #[snafu(display("Category id `{}` is not part of the category mapping", category_id))]
    UnknownCategory { category_id: i64 },
    #[snafu(display(
        "{} categories plus background exceed the {}-bit pixel word",
        num_categories,
        bits
    ))]
    TooManyCategories { num_categories: usize, bits: u32 },
    #[snafu(display("Category id `{}` is mapped more than once", category_id))]
    DuplicateCategory { category_id: i64 },
    #[snafu(display("Category id `{}` uses the reserved background name `{}`", category_id, name))]
    ReservedCategory { category_id: i64, name: String },
    #[snafu(display("Bit index {} does not fit the {}-bit pixel word", bit, bits))]
    BitOutOfRange { bit: usize, bits: u32 },
    #[snafu(display(
        "Pixel pattern uses class bit {} but the matrix only has {} classes",
        bit,
        num_classes
    ))]
    ClassOutOfRange { bit: usize, num_classes: usize },
    #[snafu(display(
        "Grid shape mismatch at stage `{}`: {:?} vs {:?}",
        stage,
        left,
        right
    ))]
    GridMismatch {
        stage: String,
        left: (usize, usize),
        right: (usize, usize),
    },
    #[snafu(display(
        "Confusion matrix shape mismatch at stage `{}`: {:?} vs {:?}",
        stage,
        left,
        right
    ))]
    MatrixMismatch {
        stage: String,
        left: (usize, usize),
        right: (usize, usize),
    },
    #[snafu(display("Contribution check failed for {}: {}", relation, message))]
    ContributionViolation { relation: String, message: String },
    #[snafu(display("Page `{}` appears more than once in the dataset", id))]
    DuplicatePage { id: String },
    #[snafu(display("Invalid evaluator config: {}", message))]
    InvalidConfig { message: String },
    #[snafu(display("Build thread pool with {} workers error: {}", workers, source))]
    ThreadPool {
        source: rayon::ThreadPoolBuildError,
        workers: usize,
    },
    #[snafu(display("Json `{}` error: {}", stage, source))]
    Json {
        source: serde_json::Error,
        stage: String,
    },
    #[snafu(display("Write `{}` error: {}", path, source))]
    IoWrite {
        source: std::io::Error,
        path: String,
    },
}
