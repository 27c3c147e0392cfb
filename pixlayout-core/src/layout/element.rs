use serde::{Deserialize, Serialize};

use crate::analysis::bbox::Bbox;

/// A single labeled region on a page, from ground truth or from a prediction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BboxResolution {
    pub category_id: i64,
    /// `[x1, y1, x2, y2]` with the origin at the top-left corner, no normalization.
    pub bbox: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl BboxResolution {
    pub fn new(category_id: i64, bbox: [f64; 4]) -> Self {
        Self {
            category_id,
            bbox,
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn bbox(&self) -> Bbox {
        Bbox::from_xyxy(self.bbox)
    }
}
