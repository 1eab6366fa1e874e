//! Classification quality metrics against ground-truth labels

use sentilens_core::{Error, Label, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Metrics for one validation run.
///
/// Per-class maps are keyed by class id and always hold all three classes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationMetrics {
    /// Unweighted mean of per-class F1
    pub macro_f1: f64,
    pub precision: BTreeMap<u8, f64>,
    pub recall: BTreeMap<u8, f64>,
    pub f1: BTreeMap<u8, f64>,
    /// `confusion_matrix[true_class][predicted_class]`
    pub confusion_matrix: [[usize; Label::COUNT]; Label::COUNT],
}

/// Compare predicted labels with true labels.
///
/// Both sequences must be non-empty, of equal length and contain only class
/// ids 0, 1 or 2. Classes without true or predicted instances score 0.
pub fn validate(true_labels: &[i64], predicted_labels: &[i64]) -> Result<ValidationMetrics> {
    if true_labels.len() != predicted_labels.len() {
        return Err(Error::ValidationInputMismatch {
            expected: true_labels.len(),
            actual: predicted_labels.len(),
        });
    }
    if true_labels.is_empty() {
        return Err(Error::invalid_argument("validation needs at least one label"));
    }

    let truth = to_labels(true_labels, "true")?;
    let predicted = to_labels(predicted_labels, "predicted")?;
    Ok(compute(&truth, &predicted))
}

/// [`validate`] over already-typed labels
pub fn validate_labels(truth: &[Label], predicted: &[Label]) -> Result<ValidationMetrics> {
    if truth.len() != predicted.len() {
        return Err(Error::ValidationInputMismatch {
            expected: truth.len(),
            actual: predicted.len(),
        });
    }
    if truth.is_empty() {
        return Err(Error::invalid_argument("validation needs at least one label"));
    }
    Ok(compute(truth, predicted))
}

fn to_labels(ids: &[i64], which: &str) -> Result<Vec<Label>> {
    ids.iter()
        .enumerate()
        .map(|(i, &id)| {
            Label::from_id(id).map_err(|_| {
                Error::invalid_argument(format!(
                    "{which} label at position {i} must be 0, 1, or 2 (got {id})"
                ))
            })
        })
        .collect()
}

fn compute(truth: &[Label], predicted: &[Label]) -> ValidationMetrics {
    let mut confusion_matrix = [[0usize; Label::COUNT]; Label::COUNT];
    for (t, p) in truth.iter().zip(predicted) {
        confusion_matrix[t.index()][p.index()] += 1;
    }

    let mut precision = BTreeMap::new();
    let mut recall = BTreeMap::new();
    let mut f1 = BTreeMap::new();

    for label in Label::ALL {
        let c = label.index();
        let true_positive = confusion_matrix[c][c] as f64;
        let predicted_total: usize = (0..Label::COUNT).map(|t| confusion_matrix[t][c]).sum();
        let actual_total: usize = confusion_matrix[c].iter().sum();

        let p = ratio(true_positive, predicted_total);
        let r = ratio(true_positive, actual_total);
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };

        precision.insert(label.id(), p);
        recall.insert(label.id(), r);
        f1.insert(label.id(), f);
    }

    let macro_f1 = f1.values().sum::<f64>() / Label::COUNT as f64;

    ValidationMetrics {
        macro_f1,
        precision,
        recall,
        f1,
        confusion_matrix,
    }
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_predictions() {
        let labels = [0, 1, 2, 2, 1];
        let metrics = validate(&labels, &labels).unwrap();
        assert!(close(metrics.macro_f1, 1.0));
        assert_eq!(metrics.confusion_matrix, [[1, 0, 0], [0, 2, 0], [0, 0, 2]]);
    }

    #[test]
    fn test_known_metrics() {
        let truth = [0, 0, 1, 1, 2, 2];
        let predicted = [0, 1, 1, 1, 2, 0];
        let metrics = validate(&truth, &predicted).unwrap();

        assert_eq!(metrics.confusion_matrix, [[1, 1, 0], [0, 2, 0], [1, 0, 1]]);
        assert!(close(metrics.precision[&0], 0.5));
        assert!(close(metrics.precision[&1], 2.0 / 3.0));
        assert!(close(metrics.precision[&2], 1.0));
        assert!(close(metrics.recall[&0], 0.5));
        assert!(close(metrics.recall[&1], 1.0));
        assert!(close(metrics.recall[&2], 0.5));

        let expected = (0.5 + 0.8 + 2.0 / 3.0) / 3.0;
        assert!(close(metrics.macro_f1, expected));
    }

    #[test]
    fn test_absent_class_scores_zero() {
        let metrics = validate(&[0, 0, 1], &[0, 0, 0]).unwrap();
        assert_eq!(metrics.precision[&2], 0.0);
        assert_eq!(metrics.recall[&2], 0.0);
        assert_eq!(metrics.precision[&1], 0.0);
        assert_eq!(metrics.recall[&1], 0.0);
        assert_eq!(metrics.precision.len(), 3);
    }

    #[test]
    fn test_length_mismatch() {
        let err = validate(&[0, 1, 2], &[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            Error::ValidationInputMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(validate(&[], &[]), Err(Error::InvalidArgument(_))));
        assert!(matches!(validate(&[0, 3], &[0, 1]), Err(Error::InvalidArgument(_))));
        assert!(matches!(validate(&[0, 1], &[0, -1]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_serializes_class_keys() {
        let metrics = validate(&[0, 1, 2], &[0, 1, 2]).unwrap();
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["precision"]["2"], 1.0);
        assert_eq!(json["confusion_matrix"][1][1], 1);
    }

    proptest! {
        #[test]
        fn prop_matrix_rows_match_true_counts(
            pairs in proptest::collection::vec((0i64..3, 0i64..3), 1..200)
        ) {
            let (truth, predicted): (Vec<i64>, Vec<i64>) = pairs.into_iter().unzip();
            let metrics = validate(&truth, &predicted).unwrap();

            for class in 0..3usize {
                let row_sum: usize = metrics.confusion_matrix[class].iter().sum();
                let count = truth.iter().filter(|&&t| t as usize == class).count();
                prop_assert_eq!(row_sum, count);
            }

            let mean_f1: f64 = (0..3u8)
                .map(|c| {
                    let (p, r) = (metrics.precision[&c], metrics.recall[&c]);
                    if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 }
                })
                .sum::<f64>() / 3.0;
            prop_assert!((metrics.macro_f1 - mean_f1).abs() < 1e-9);
        }
    }
}
