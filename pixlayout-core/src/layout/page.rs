use serde::{Deserialize, Serialize};

use crate::layout::element::BboxResolution;

/// One page to evaluate: its size plus ground-truth and predicted regions.
///
/// A missing prediction means the layout model produced nothing for the page,
/// which is evaluated as an all-background prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSample {
    pub id: String,
    pub page_width: usize,
    pub page_height: usize,
    pub ground_truth: Vec<BboxResolution>,
    #[serde(default)]
    pub prediction: Option<Vec<BboxResolution>>,
}

impl LayoutSample {
    pub fn new(id: impl Into<String>, page_width: usize, page_height: usize) -> Self {
        Self {
            id: id.into(),
            page_width,
            page_height,
            ground_truth: Vec::new(),
            prediction: None,
        }
    }

    pub fn with_ground_truth(mut self, ground_truth: Vec<BboxResolution>) -> Self {
        self.ground_truth = ground_truth;
        self
    }

    pub fn with_prediction(mut self, prediction: Vec<BboxResolution>) -> Self {
        self.prediction = Some(prediction);
        self
    }

    pub fn num_pixels(&self) -> usize {
        self.page_width * self.page_height
    }
}
