use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{consts::DEFAULT_CONCURRENCY, error::PixlayoutError, pixel::confusion::ValidationMode};

/// Settings of a [`crate::evaluate::evaluator::PixelLayoutEvaluator`].
///
/// ```
/// use pixlayout_core::evaluate::config::EvaluatorConfigBuilder;
/// use pixlayout_core::pixel::confusion::ValidationMode;
///
/// let config = EvaluatorConfigBuilder::default()
///     .concurrency(8)
///     .validation_mode(ValidationMode::Log)
///     .build()
///     .unwrap();
/// assert!(config.set_background);
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Number of pages evaluated at the same time.
    pub concurrency: usize,
    pub validation_mode: ValidationMode,
    /// Mark pixels without any box as background, on both sides.
    pub set_background: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            validation_mode: ValidationMode::Disabled,
            set_background: true,
        }
    }
}

impl EvaluatorConfig {
    pub fn validate(&self) -> Result<(), PixlayoutError> {
        check_concurrency(self.concurrency)
            .map_err(|message| PixlayoutError::InvalidConfig { message })
    }
}

impl EvaluatorConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.concurrency {
            Some(concurrency) => check_concurrency(concurrency),
            None => Ok(()),
        }
    }
}

fn check_concurrency(concurrency: usize) -> Result<(), String> {
    if concurrency == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    Ok(())
}
