use std::{
    collections::{BTreeMap, btree_map::Entry},
    fs,
    path::{Path, PathBuf},
};

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::*;

use crate::{
    analysis::labels::CategoryMap,
    consts::EVALUATION_JSON_FILENAME,
    error::{IoWriteSnafu, JsonSnafu, PixlayoutError, ThreadPoolSnafu},
    evaluate::config::EvaluatorConfig,
    layout::page::LayoutSample,
    pixel::{
        compress::compress,
        confusion::{ConfusionEngine, ContributionDiagnostic},
        grid::{PixelLabelGrid, encode},
        metrics::{MultiLabelMatrixEvaluation, compute_metrics},
        stats::DatasetStatistics,
    },
};

/// Pixel evaluation of a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePixelEvaluation {
    pub id: String,
    pub num_pixels: u64,
    pub matrix_evaluation: MultiLabelMatrixEvaluation,
    /// Failed contribution checks of this page in [`ValidationMode::Log`].
    ///
    /// [`ValidationMode::Log`]: crate::pixel::confusion::ValidationMode::Log
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ContributionDiagnostic>,
}

/// Pixel evaluation of a whole dataset.
///
/// `matrix_evaluation` is computed on the sum of all page confusion matrices,
/// not averaged from the page metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPixelEvaluation {
    pub evaluated_samples: usize,
    pub num_pages: usize,
    pub num_pixels: u64,
    pub matrix_evaluation: MultiLabelMatrixEvaluation,
    pub page_evaluations: BTreeMap<String, PagePixelEvaluation>,
    /// Spread of the per-page mean F1 over all classes.
    pub f1_all_classes_stats: DatasetStatistics,
    /// Spread of the per-page mean F1 over background vs. everything else.
    pub f1_collapsed_classes_stats: DatasetStatistics,
}

/// Files written by [`PixelLayoutEvaluator::export_json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationFilenames {
    pub json: PathBuf,
}

/// Multi-label pixel evaluator for document layouts.
#[derive(Debug, Clone)]
pub struct PixelLayoutEvaluator {
    categories: CategoryMap,
    config: EvaluatorConfig,
    engine: ConfusionEngine,
}

impl PixelLayoutEvaluator {
    /// Creates an evaluator for `categories`, given as `(category_id, name)`
    /// pairs without the background.
    pub fn new<I, S>(categories: I, config: EvaluatorConfig) -> Result<Self, PixlayoutError>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        config.validate()?;
        let categories = CategoryMap::new(categories)?;
        info!(
            "Pixel layout evaluator ready: {} categories, concurrency {}, validation {:?}",
            categories.num_classes() - 1,
            config.concurrency,
            config.validation_mode
        );

        Ok(Self {
            categories,
            engine: ConfusionEngine::new(config.validation_mode),
            config,
        })
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluates one page on the calling thread.
    #[instrument(skip_all, fields(page = %sample.id))]
    pub fn evaluate_sample(
        &self,
        sample: &LayoutSample,
    ) -> Result<PagePixelEvaluation, PixlayoutError> {
        let (width, height) = (sample.page_width, sample.page_height);
        let set_background = self.config.set_background;

        let pairs = {
            let gt = encode(
                width,
                height,
                &sample.ground_truth,
                &self.categories,
                set_background,
            )?;
            let pred = match &sample.prediction {
                Some(prediction) => {
                    encode(width, height, prediction, &self.categories, set_background)?
                }
                None => {
                    debug!("No prediction, evaluating against an all-background page");
                    PixelLabelGrid::all_background(width, height)
                }
            };
            compress(&gt, &pred)?
        };

        let accumulation = self
            .engine
            .accumulate(&pairs, self.categories.num_classes())?;
        if !accumulation.diagnostics.is_empty() {
            warn!(
                "{} pixel patterns failed the contribution checks",
                accumulation.diagnostics.len()
            );
        }

        let matrix_evaluation = compute_metrics(
            &accumulation.confusion_matrix,
            self.categories.class_names(),
        );
        Ok(PagePixelEvaluation {
            id: sample.id.clone(),
            num_pixels: pairs.num_pixels(),
            matrix_evaluation,
            diagnostics: accumulation.diagnostics,
        })
    }

    /// Evaluates all pages on a pool of `concurrency` threads and aggregates
    /// them. The first failing page aborts the run.
    #[instrument(skip_all, fields(samples = samples.len()))]
    pub fn evaluate_dataset(
        &self,
        samples: &[LayoutSample],
    ) -> Result<DatasetPixelEvaluation, PixlayoutError> {
        let workers = self.config.concurrency;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context(ThreadPoolSnafu { workers })?;

        info!(
            "Evaluating {} pages with {} workers",
            samples.len(),
            workers
        );
        let page_evaluations = pool.install(|| {
            samples
                .par_iter()
                .map(|sample| self.evaluate_sample(sample))
                .collect::<Result<Vec<_>, PixlayoutError>>()
        })?;
        info!("Collected {} page evaluations", page_evaluations.len());

        self.aggregate(page_evaluations)
    }

    /// Reduces page evaluations into the dataset evaluation.
    ///
    /// Pages are summed in page-id order so that the result does not depend on
    /// the order they were computed in.
    pub fn aggregate<I>(&self, page_evaluations: I) -> Result<DatasetPixelEvaluation, PixlayoutError>
    where
        I: IntoIterator<Item = PagePixelEvaluation>,
    {
        let mut pages = BTreeMap::new();
        let mut evaluated_samples = 0;
        for page in page_evaluations {
            evaluated_samples += 1;
            match pages.entry(page.id.clone()) {
                Entry::Occupied(_) => return Err(PixlayoutError::DuplicatePage { id: page.id }),
                Entry::Vacant(entry) => {
                    entry.insert(page);
                }
            }
        }

        let num_classes = self.categories.num_classes();
        let mut confusion_matrix = Array2::<f64>::zeros((num_classes, num_classes));
        let mut num_pixels = 0;
        let mut pages_detailed_f1 = Vec::with_capacity(pages.len());
        let mut pages_collapsed_f1 = Vec::with_capacity(pages.len());

        for page in pages.values() {
            let page_matrix = &page.matrix_evaluation.detailed.confusion_matrix;
            if page_matrix.dim() != confusion_matrix.dim() {
                return Err(PixlayoutError::MatrixMismatch {
                    stage: format!("aggregate page {}", page.id),
                    left: confusion_matrix.dim(),
                    right: page_matrix.dim(),
                });
            }
            confusion_matrix += &page_matrix.0;
            num_pixels += page.num_pixels;

            pages_detailed_f1.push(page.matrix_evaluation.detailed.agg_metrics.classes_f1_mean);
            pages_collapsed_f1.push(page.matrix_evaluation.collapsed.agg_metrics.classes_f1_mean);
        }

        let matrix_evaluation = compute_metrics(&confusion_matrix, self.categories.class_names());
        debug!(
            "Dataset mean F1: {:.4} detailed, {:.4} collapsed",
            matrix_evaluation.detailed.agg_metrics.classes_f1_mean,
            matrix_evaluation.collapsed.agg_metrics.classes_f1_mean
        );

        Ok(DatasetPixelEvaluation {
            evaluated_samples,
            num_pages: pages.len(),
            num_pixels,
            matrix_evaluation,
            page_evaluations: pages,
            f1_all_classes_stats: DatasetStatistics::from_scores(&pages_detailed_f1),
            f1_collapsed_classes_stats: DatasetStatistics::from_scores(&pages_collapsed_f1),
        })
    }

    /// Names the files [`Self::export_json`] writes under `save_root`.
    pub fn evaluation_filenames(save_root: &Path) -> EvaluationFilenames {
        EvaluationFilenames {
            json: save_root.join(EVALUATION_JSON_FILENAME),
        }
    }

    /// Writes the dataset evaluation as pretty-printed JSON under `save_root`,
    /// creating the directory when needed.
    pub fn export_json(
        &self,
        evaluation: &DatasetPixelEvaluation,
        save_root: &Path,
    ) -> Result<EvaluationFilenames, PixlayoutError> {
        fs::create_dir_all(save_root).context(IoWriteSnafu {
            path: save_root.display().to_string(),
        })?;

        let filenames = Self::evaluation_filenames(save_root);
        let json = serde_json::to_string_pretty(evaluation).context(JsonSnafu {
            stage: "export-dataset",
        })?;
        fs::write(&filenames.json, json).context(IoWriteSnafu {
            path: filenames.json.display().to_string(),
        })?;

        info!("Saved pixel layout evaluation: {}", filenames.json.display());
        Ok(filenames)
    }
}
