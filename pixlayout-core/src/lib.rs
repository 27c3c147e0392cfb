pub mod analysis;
pub mod consts;
pub mod error;
pub mod evaluate;
pub mod layout;
pub mod pixel;

// Re-export commonly used types
pub use analysis::{bbox::Bbox, labels::CategoryMap};
pub use error::PixlayoutError;
pub use evaluate::{
    config::{EvaluatorConfig, EvaluatorConfigBuilder},
    evaluator::{DatasetPixelEvaluation, PagePixelEvaluation, PixelLayoutEvaluator},
};
pub use layout::{element::BboxResolution, page::LayoutSample};
pub use pixel::{
    confusion::{ConfusionEngine, ValidationMode},
    metrics::MultiLabelMatrixEvaluation,
};
