use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis, Zip, array, s};
use serde::{Deserialize, Serialize};

use crate::{
    consts::{ALL_COLLAPSED_CLASSES_NAME, BACKGROUND_ID, BACKGROUND_NAME},
    pixel::matrix::ClassMatrix,
};

/// Per-class diagonal metrics and their means over all classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLabelMatrixAggMetrics {
    pub classes_precision: BTreeMap<String, f64>,
    pub classes_recall: BTreeMap<String, f64>,
    pub classes_f1: BTreeMap<String, f64>,
    pub classes_precision_mean: f64,
    pub classes_recall_mean: f64,
    pub classes_f1_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLabelMatrixMetrics {
    pub class_names: BTreeMap<usize, String>,
    pub confusion_matrix: ClassMatrix,
    pub precision_matrix: ClassMatrix,
    pub recall_matrix: ClassMatrix,
    pub f1_matrix: ClassMatrix,
    pub agg_metrics: MultiLabelMatrixAggMetrics,
}

/// Metrics over all classes and over the background/foreground collapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLabelMatrixEvaluation {
    pub detailed: MultiLabelMatrixMetrics,
    pub collapsed: MultiLabelMatrixMetrics,
}

/// Computes detailed and collapsed metrics of a confusion matrix.
///
/// The collapsed view keeps the name of class 0 from `class_names` and calls
/// the merged class `all_classes`.
pub fn compute_metrics(
    confusion_matrix: &Array2<f64>,
    class_names: &BTreeMap<usize, String>,
) -> MultiLabelMatrixEvaluation {
    let background_name = class_names
        .get(&BACKGROUND_ID)
        .map_or(BACKGROUND_NAME, String::as_str);
    let collapsed_names = BTreeMap::from([
        (0, background_name.to_string()),
        (1, ALL_COLLAPSED_CLASSES_NAME.to_string()),
    ]);

    MultiLabelMatrixEvaluation {
        detailed: compute_matrix_metrics(confusion_matrix, class_names),
        collapsed: compute_matrix_metrics(&collapse(confusion_matrix), &collapsed_names),
    }
}

/// Merges every non-background class into one.
///
/// The result is `[[cm00, Σ cm[0, 1..]], [Σ cm[1.., 0], Σ cm[1.., 1..]]]`.
pub fn collapse(confusion_matrix: &Array2<f64>) -> Array2<f64> {
    if confusion_matrix.is_empty() {
        return Array2::zeros((2, 2));
    }

    let bg = BACKGROUND_ID;
    let fg = bg + 1;
    let background = confusion_matrix[(bg, bg)];
    let missed = confusion_matrix.slice(s![bg..fg, fg..]).sum();
    let extra = confusion_matrix.slice(s![fg.., bg..fg]).sum();
    let foreground = confusion_matrix.slice(s![fg.., fg..]).sum();

    array![[background, missed], [extra, foreground]]
}

/// Precision, recall and F1 matrices plus the diagonal aggregates.
///
/// A cell whose denominator is zero is zero: precision divides by the column
/// sum, recall by the row sum, and F1 by `p + r`.
pub fn compute_matrix_metrics(
    confusion_matrix: &Array2<f64>,
    class_names: &BTreeMap<usize, String>,
) -> MultiLabelMatrixMetrics {
    let col_sums = confusion_matrix.sum_axis(Axis(0));
    let row_sums = confusion_matrix.sum_axis(Axis(1));

    let mut precision_matrix = Array2::zeros(confusion_matrix.raw_dim());
    let mut recall_matrix = Array2::zeros(confusion_matrix.raw_dim());
    for ((row, col), &value) in confusion_matrix.indexed_iter() {
        precision_matrix[(row, col)] = safe_div(value, col_sums[col]);
        recall_matrix[(row, col)] = safe_div(value, row_sums[row]);
    }

    let f1_matrix = Zip::from(&precision_matrix)
        .and(&recall_matrix)
        .map_collect(|&p, &r| safe_div(2.0 * p * r, p + r));

    let precision = precision_matrix.diag().to_owned();
    let recall = recall_matrix.diag().to_owned();
    let f1 = f1_matrix.diag().to_owned();

    let by_name = |values: &Array1<f64>| -> BTreeMap<String, f64> {
        values
            .iter()
            .enumerate()
            .map(|(id, &value)| (class_name(class_names, id), value))
            .collect()
    };

    let agg_metrics = MultiLabelMatrixAggMetrics {
        classes_precision: by_name(&precision),
        classes_recall: by_name(&recall),
        classes_f1: by_name(&f1),
        classes_precision_mean: mean(&precision),
        classes_recall_mean: mean(&recall),
        classes_f1_mean: mean(&f1),
    };

    MultiLabelMatrixMetrics {
        class_names: class_names.clone(),
        confusion_matrix: ClassMatrix(confusion_matrix.to_owned()),
        precision_matrix: ClassMatrix(precision_matrix),
        recall_matrix: ClassMatrix(recall_matrix),
        f1_matrix: ClassMatrix(f1_matrix),
        agg_metrics,
    }
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean(values: &Array1<f64>) -> f64 {
    values.mean().unwrap_or(0.0)
}

fn class_name(class_names: &BTreeMap<usize, String>, id: usize) -> String {
    class_names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-8;

    fn names(items: &[&str]) -> BTreeMap<usize, String> {
        items
            .iter()
            .enumerate()
            .map(|(id, name)| (id, name.to_string()))
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn test_identity_matrix_is_perfect() {
        let cm = Array2::from_diag(&array![10.0, 4.0, 2.0]);
        let metrics = compute_matrix_metrics(&cm, &names(&["Background", "text", "table"]));

        assert_eq!(*metrics.precision_matrix, Array2::<f64>::eye(3));
        assert_eq!(*metrics.recall_matrix, Array2::<f64>::eye(3));
        assert_eq!(*metrics.f1_matrix, Array2::<f64>::eye(3));
        assert_eq!(metrics.agg_metrics.classes_f1["table"], 1.0);
        assert_eq!(metrics.agg_metrics.classes_f1_mean, 1.0);
        assert_eq!(metrics.agg_metrics.classes_precision.len(), 3);
    }

    #[test]
    fn test_zero_denominators_give_zero() {
        let cm = array![[3.0, 1.0, 0.0], [0.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let metrics = compute_matrix_metrics(&cm, &names(&["Background", "a", "b"]));

        // Empty row 1 and empty column 2
        assert!(metrics.recall_matrix.row(1).iter().all(|&v| v == 0.0));
        assert!(metrics.precision_matrix.column(2).iter().all(|&v| v == 0.0));
        assert!(metrics.f1_matrix.iter().all(|v| v.is_finite()));

        assert!(close(metrics.precision_matrix[(0, 0)], 0.6));
        assert!(close(metrics.recall_matrix[(0, 0)], 0.75));
        assert!(close(metrics.f1_matrix[(0, 0)], 2.0 * 0.6 * 0.75 / 1.35));
        assert_eq!(metrics.agg_metrics.classes_f1["b"], 0.0);
    }

    #[test]
    fn test_precision_columns_and_recall_rows_normalize() {
        let cm = array![
            [5.0, 1.0, 0.5, 0.0],
            [0.25, 7.0, 0.0, 1.0],
            [2.0, 0.0, 3.0, 1.5],
            [0.0, 0.0, 0.75, 4.0]
        ];
        let metrics = compute_matrix_metrics(&cm, &names(&["Background", "a", "b", "c"]));

        for sum in metrics.precision_matrix.sum_axis(Axis(0)) {
            assert!(close(sum, 1.0));
        }
        for sum in metrics.recall_matrix.sum_axis(Axis(1)) {
            assert!(close(sum, 1.0));
        }
    }

    #[test]
    fn test_collapse_sums_blocks() {
        let cm = array![[102.0, 2.0, 0.0, 2.0], [0.0, 6.0, 0.0, 0.0], [0.0, 0.5, 3.0, 0.5], [4.0, 0.0, 0.0, 0.0]];
        let collapsed = collapse(&cm);
        assert_eq!(collapsed, array![[102.0, 4.0], [4.0, 10.0]]);
        assert_eq!(collapsed.sum(), cm.sum());

        assert_eq!(collapse(&Array2::from_elem((1, 1), 7.0)), array![[7.0, 0.0], [0.0, 0.0]]);
        assert_eq!(collapse(&Array2::zeros((0, 0))), Array2::<f64>::zeros((2, 2)));
    }

    #[test]
    fn test_collapsed_view_keeps_caller_class_zero_name() {
        let cm = array![[1.0, 0.0], [0.0, 1.0]];
        let evaluation = compute_metrics(&cm, &names(&["classA", "classB"]));

        assert_eq!(evaluation.collapsed.class_names[&0], "classA");
        assert_eq!(evaluation.collapsed.class_names[&1], ALL_COLLAPSED_CLASSES_NAME);
        assert_eq!(evaluation.collapsed.agg_metrics.classes_f1["classA"], 1.0);

        // Without a name for class 0 the background name is used
        let unnamed = compute_metrics(&cm, &BTreeMap::from([(1, "text".to_string())]));
        assert_eq!(unnamed.collapsed.class_names[&0], BACKGROUND_NAME);
        assert_eq!(unnamed.detailed.agg_metrics.classes_f1["0"], 1.0);
    }

    #[test]
    fn test_compute_metrics_names_collapsed_classes() {
        let cm = array![[8.0, 2.0], [1.0, 9.0]];
        let evaluation = compute_metrics(&cm, &names(&["Background", "text"]));

        assert_eq!(evaluation.collapsed.class_names[&0], BACKGROUND_NAME);
        assert_eq!(evaluation.collapsed.class_names[&1], ALL_COLLAPSED_CLASSES_NAME);
        // With a single category the collapse is the matrix itself
        assert_eq!(
            evaluation.collapsed.confusion_matrix,
            evaluation.detailed.confusion_matrix
        );

        let json = serde_json::to_value(&evaluation).unwrap();
        assert_eq!(json["detailed"]["confusion_matrix"][0][1], 2.0);
        assert_eq!(json["collapsed"]["class_names"]["1"], ALL_COLLAPSED_CLASSES_NAME);
    }
}
