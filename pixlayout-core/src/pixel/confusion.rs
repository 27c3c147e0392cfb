use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    consts::{BACKGROUND_ID, CONTRIBUTION_TOLERANCE, PIXEL_WORD_BITS},
    error::PixlayoutError,
    pixel::{
        compress::CompressedPairs,
        matrix::ClassMatrix,
        relation::{LabelRelation, set_bits},
    },
};

/// What to do when a pixel pattern's contribution breaks the row-sum checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Skip the checks.
    #[default]
    Disabled,
    /// Log the violation and keep a diagnostic, then continue.
    Log,
    /// Abort with [`PixlayoutError::ContributionViolation`].
    Raise,
}

/// A failed contribution check, recorded in [`ValidationMode::Log`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionDiagnostic {
    pub relation: String,
    pub gt: u64,
    pub pred: u64,
    pub message: String,
}

/// Confusion matrix of a set of pixel pairs plus any logged diagnostics.
#[derive(Debug, Clone)]
pub struct Accumulation {
    pub confusion_matrix: ClassMatrix,
    pub diagnostics: Vec<ContributionDiagnostic>,
}

/// Multi-label confusion matrix builder.
///
/// Each unique `(g, p)` pattern adds a contribution whose row `i` sums to one
/// exactly when label `i` is set in `g`, so that row `i` of the result adds up
/// to the pixel count of label `i` in ground truth.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfusionEngine {
    validation_mode: ValidationMode,
}

/// Unweighted contribution of one pattern as `(row, col, value)` cells.
type Contribution = Vec<(usize, usize, f64)>;

impl ConfusionEngine {
    pub fn new(validation_mode: ValidationMode) -> Self {
        Self { validation_mode }
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode
    }

    /// Builds the `num_classes × num_classes` confusion matrix of `pairs`.
    pub fn accumulate(
        &self,
        pairs: &CompressedPairs,
        num_classes: usize,
    ) -> Result<Accumulation, PixlayoutError> {
        if num_classes > PIXEL_WORD_BITS as usize {
            return Err(PixlayoutError::TooManyCategories {
                num_categories: num_classes.saturating_sub(1),
                bits: PIXEL_WORD_BITS,
            });
        }

        let mut confusion_matrix = ClassMatrix::zeros(num_classes);
        let mut diagnostics = Vec::new();

        for (g, p, count) in pairs.iter() {
            if let Some(bit) = set_bits(g | p).find(|&bit| bit >= num_classes) {
                return Err(PixlayoutError::ClassOutOfRange { bit, num_classes });
            }

            let relation = LabelRelation::classify(g, p);
            let contribution = contribute(relation, g, p);

            if self.validation_mode != ValidationMode::Disabled {
                if let Some(message) = check_contribution(g, &contribution, num_classes) {
                    self.report(relation, g, p, message, &mut diagnostics)?;
                }
            }

            let weight = count as f64;
            for (row, col, value) in contribution {
                confusion_matrix[(row, col)] += weight * value;
            }
        }

        debug!(
            "Accumulated {} patterns into a {}x{} confusion matrix",
            pairs.len(),
            num_classes,
            num_classes
        );
        Ok(Accumulation {
            confusion_matrix,
            diagnostics,
        })
    }

    fn report(
        &self,
        relation: LabelRelation,
        g: u64,
        p: u64,
        message: String,
        diagnostics: &mut Vec<ContributionDiagnostic>,
    ) -> Result<(), PixlayoutError> {
        let message = format!("gt={g:#b} pred={p:#b}: {message}");
        match self.validation_mode {
            ValidationMode::Raise => Err(PixlayoutError::ContributionViolation {
                relation: relation.to_string(),
                message,
            }),
            ValidationMode::Log => {
                error!("Contribution check failed for {}: {}", relation, message);
                diagnostics.push(ContributionDiagnostic {
                    relation: relation.to_string(),
                    gt: g,
                    pred: p,
                    message,
                });
                Ok(())
            }
            ValidationMode::Disabled => Ok(()),
        }
    }
}

/// Contribution of a single pixel with ground truth `g` and prediction `p`.
fn contribute(relation: LabelRelation, g: u64, p: u64) -> Contribution {
    let mut cells = Contribution::new();
    match relation {
        LabelRelation::Equal => {
            cells.extend(set_bits(g).map(|i| (i, i, 1.0)));
        }
        LabelRelation::StrictSuperset => {
            let n_gt = g.count_ones() as f64;
            let n_pred = p.count_ones() as f64;
            let extra = p & !g;
            for i in set_bits(g) {
                cells.extend(set_bits(extra).map(|j| (i, j, 1.0 / n_pred)));
                cells.push((i, i, n_gt / n_pred));
            }
        }
        LabelRelation::StrictSubset => {
            let missed = g & !p;
            if p == 0 {
                // Nothing predicted: a missed label lands in the background column
                cells.extend(
                    set_bits(missed)
                        .filter(|&i| i != BACKGROUND_ID)
                        .map(|i| (i, BACKGROUND_ID, 1.0)),
                );
            } else {
                let n_pred = p.count_ones() as f64;
                for i in set_bits(missed) {
                    cells.extend(set_bits(p).map(|j| (i, j, 1.0 / n_pred)));
                }
                cells.extend(set_bits(p).map(|j| (j, j, 1.0)));
            }
        }
        LabelRelation::Incomparable => {
            let missed = g & !p;
            let extra = p & !g;
            let n_extra = extra.count_ones() as f64;
            for i in set_bits(missed) {
                cells.extend(set_bits(extra).map(|j| (i, j, 1.0 / n_extra)));
            }
            cells.extend(set_bits(g & p).map(|k| (k, k, 1.0)));
        }
    }
    cells
}

/// Checks that the rows of `contribution` reproduce the bits of `g` and that
/// its total equals `popcount(g)`. Returns the first failure.
fn check_contribution(g: u64, contribution: &Contribution, num_classes: usize) -> Option<String> {
    let mut row_sums = vec![0.0; num_classes];
    for &(row, _, value) in contribution {
        row_sums[row] += value;
    }

    for (row, &sum) in row_sums.iter().enumerate() {
        let expected = if g >> row & 1 == 1 { 1.0 } else { 0.0 };
        if (sum - expected).abs() > CONTRIBUTION_TOLERANCE {
            return Some(format!(
                "row {row} sums to {sum}, expected {expected}"
            ));
        }
    }

    let total: f64 = row_sums.iter().sum();
    let expected_total = g.count_ones() as f64;
    if (total - expected_total).abs() > CONTRIBUTION_TOLERANCE {
        return Some(format!(
            "contribution sums to {total}, expected {expected_total}"
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn pairs(triples: &[(u64, u64, u64)]) -> CompressedPairs {
        CompressedPairs {
            gt: triples.iter().map(|t| t.0).collect(),
            pred: triples.iter().map(|t| t.1).collect(),
            counts: triples.iter().map(|t| t.2).collect(),
        }
    }

    fn assert_matrix_close(actual: &Array2<f64>, expected: &Array2<f64>) {
        assert_eq!(actual.dim(), expected.dim());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < TOLERANCE, "{actual:?} != {expected:?}");
        }
    }

    fn accumulate(triples: &[(u64, u64, u64)], num_classes: usize) -> Array2<f64> {
        ConfusionEngine::new(ValidationMode::Raise)
            .accumulate(&pairs(triples), num_classes)
            .unwrap()
            .confusion_matrix
            .into_inner()
    }

    #[test]
    fn test_exact_match_fills_diagonal() {
        let cm = accumulate(&[(0b001, 0b001, 5), (0b110, 0b110, 2)], 3);
        assert_matrix_close(
            &cm,
            &array![[5.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]],
        );
    }

    #[test]
    fn test_prediction_superset_splits_credit() {
        // G = {1}, P = {1, 2, 3}
        let cm = accumulate(&[(0b0010, 0b1110, 3)], 4);
        let mut expected = Array2::<f64>::zeros((4, 4));
        expected[(1, 1)] = 1.0;
        expected[(1, 2)] = 1.0;
        expected[(1, 3)] = 1.0;
        assert_matrix_close(&cm, &expected);

        // G = {1, 2}, P = {1, 2, 3}: each GT row keeps 2/3 and loses 1/3
        let cm = accumulate(&[(0b0110, 0b1110, 3)], 4);
        let mut expected = Array2::<f64>::zeros((4, 4));
        expected[(1, 1)] = 2.0;
        expected[(1, 3)] = 1.0;
        expected[(2, 2)] = 2.0;
        expected[(2, 3)] = 1.0;
        assert_matrix_close(&cm, &expected);
    }

    #[test]
    fn test_ground_truth_superset_keeps_predicted_diagonal() {
        // G = {1, 2}, P = {1}
        let cm = accumulate(&[(0b110, 0b010, 4)], 3);
        assert_matrix_close(
            &cm,
            &array![[0.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 4.0, 0.0]],
        );

        // G = {1, 2, 3}, P = {1, 2}: the missed label is spread over P
        let cm = accumulate(&[(0b1110, 0b0110, 2)], 4);
        let mut expected = Array2::<f64>::zeros((4, 4));
        expected[(1, 1)] = 2.0;
        expected[(2, 2)] = 2.0;
        expected[(3, 1)] = 1.0;
        expected[(3, 2)] = 1.0;
        assert_matrix_close(&cm, &expected);
    }

    #[test]
    fn test_incomparable_moves_missed_to_extra() {
        // G = {0, 1}, P = {1, 2, 3}: I = {1}, M = {0}, E = {2, 3}
        let cm = accumulate(&[(0b0011, 0b1110, 2)], 4);
        let mut expected = Array2::<f64>::zeros((4, 4));
        expected[(1, 1)] = 2.0;
        expected[(0, 2)] = 1.0;
        expected[(0, 3)] = 1.0;
        assert_matrix_close(&cm, &expected);

        // Disjoint sets keep no diagonal credit
        let cm = accumulate(&[(0b001, 0b100, 6)], 3);
        assert_matrix_close(
            &cm,
            &array![[0.0, 0.0, 6.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
        );
    }

    #[test]
    fn test_row_sums_match_ground_truth_counts() {
        let triples = [
            (0b0001, 0b0001, 40),
            (0b0010, 0b0110, 7),
            (0b0110, 0b0010, 3),
            (0b1010, 0b0101, 5),
            (0b1000, 0b1111, 2),
            (0b0111, 0b1000, 1),
        ];
        let cm = accumulate(&triples, 4);

        for class in 0..4 {
            let expected: u64 = triples
                .iter()
                .filter(|(g, _, _)| g >> class & 1 == 1)
                .map(|(_, _, c)| c)
                .sum();
            let row_sum = cm.row(class).sum();
            assert!((row_sum - expected as f64).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_accumulation_is_order_independent() {
        let triples = [
            (0b0011, 0b0110, 11),
            (0b0100, 0b1100, 3),
            (0b1110, 0b0010, 9),
            (0b0001, 0b0001, 50),
        ];
        let mut reversed = triples;
        reversed.reverse();

        assert_matrix_close(&accumulate(&triples, 4), &accumulate(&reversed, 4));
    }

    #[test]
    fn test_empty_input_is_zero_matrix() {
        let cm = accumulate(&[], 3);
        assert_matrix_close(&cm, &Array2::zeros((3, 3)));

        // Unlabeled pixels on both sides contribute nothing
        let cm = accumulate(&[(0, 0, 12)], 3);
        assert_matrix_close(&cm, &Array2::zeros((3, 3)));
    }

    #[test]
    fn test_empty_prediction_goes_to_background_column() {
        let engine = ConfusionEngine::new(ValidationMode::Raise);
        let result = engine.accumulate(&pairs(&[(0b110, 0, 3)]), 3).unwrap();
        assert_matrix_close(
            &result.confusion_matrix,
            &array![[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [3.0, 0.0, 0.0]],
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_validation_modes_on_lost_background() {
        // A background pixel predicted as nothing has no column to go to
        let lost = pairs(&[(0b001, 0, 4), (0b010, 0b010, 1)]);

        let err = ConfusionEngine::new(ValidationMode::Raise)
            .accumulate(&lost, 2)
            .unwrap_err();
        assert!(matches!(err, PixlayoutError::ContributionViolation { .. }));

        let logged = ConfusionEngine::new(ValidationMode::Log)
            .accumulate(&lost, 2)
            .unwrap();
        assert_eq!(logged.diagnostics.len(), 1);
        assert_eq!(logged.diagnostics[0].gt, 0b001);
        assert_eq!(logged.diagnostics[0].pred, 0);
        assert_eq!(logged.diagnostics[0].relation, "prediction subset");
        assert_eq!(logged.confusion_matrix[(1, 1)], 1.0);

        let silent = ConfusionEngine::default().accumulate(&lost, 2).unwrap();
        assert!(silent.diagnostics.is_empty());
        assert_eq!(silent.confusion_matrix.total(), 1.0);
    }

    #[test]
    fn test_rejects_bits_outside_matrix() {
        let err = ConfusionEngine::default()
            .accumulate(&pairs(&[(0b001, 0b1000, 1)]), 3)
            .unwrap_err();
        assert!(matches!(
            err,
            PixlayoutError::ClassOutOfRange {
                bit: 3,
                num_classes: 3
            }
        ));
    }

    #[test]
    fn test_validation_mode_serde() {
        let mode: ValidationMode = serde_json::from_str("\"raise\"").unwrap();
        assert_eq!(mode, ValidationMode::Raise);
        assert_eq!(serde_json::to_string(&ValidationMode::Log).unwrap(), "\"log\"");
        assert_eq!(ValidationMode::default(), ValidationMode::Disabled);

        assert_eq!(ConfusionEngine::default().validation_mode(), ValidationMode::Disabled);
        assert_eq!(
            ConfusionEngine::new(ValidationMode::Raise).validation_mode(),
            ValidationMode::Raise
        );
    }
}
