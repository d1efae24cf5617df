//! Classification scores computed on a held-out partition.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Probability at or above which a row is predicted positive
pub const DECISION_THRESHOLD: f64 = 0.5;

/// AUC reported when the test labels hold a single class
pub const UNDEFINED_AUC: f64 = 0.5;

/// Accuracy, precision, recall, F1 and AUC-ROC for a binary classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationScores {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc_roc: f64,
}

/// Confusion matrix counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut matrix = Self::default();
        for (&truth, &pred) in y_true.iter().zip(y_pred) {
            match (truth == 1, pred == 1) {
                (true, true) => matrix.true_positives += 1,
                (false, true) => matrix.false_positives += 1,
                (false, false) => matrix.true_negatives += 1,
                (true, false) => matrix.false_negatives += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

impl ClassificationScores {
    /// Score predicted probabilities against true labels
    ///
    /// Precision, recall and F1 fall back to 0 on zero division.
    pub fn compute(y_true: &[u8], y_proba: &[f64]) -> Self {
        let y_pred: Vec<u8> = y_proba
            .iter()
            .map(|&p| u8::from(p >= DECISION_THRESHOLD))
            .collect();
        let cm = ConfusionMatrix::from_predictions(y_true, &y_pred);

        let accuracy = ratio(cm.true_positives + cm.true_negatives, cm.total());
        let precision = ratio(cm.true_positives, cm.true_positives + cm.false_positives);
        let recall = ratio(cm.true_positives, cm.true_positives + cm.false_negatives);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            auc_roc: roc_auc(y_true, y_proba),
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve via the Mann-Whitney rank statistic
///
/// Tied scores share their average rank. Returns [`UNDEFINED_AUC`] when only
/// one class is present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> f64 {
    let n = y_true.len().min(scores.len());
    let n_pos = y_true[..n].iter().filter(|&&y| y == 1).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return UNDEFINED_AUC;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut pos_rank_sum = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based; the tie group i..=j shares the mean rank
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                pos_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    u / (n_pos as f64 * n_neg as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_classifier() {
        let y = [0, 0, 1, 1];
        let p = [0.1, 0.2, 0.8, 0.9];
        let scores = ClassificationScores::compute(&y, &p);

        assert_eq!(scores.accuracy, 1.0);
        assert_eq!(scores.precision, 1.0);
        assert_eq!(scores.recall, 1.0);
        assert_eq!(scores.f1_score, 1.0);
        assert_eq!(scores.auc_roc, 1.0);
    }

    #[test]
    fn test_zero_division_defaults() {
        // nothing predicted positive
        let y = [0, 1, 0, 1];
        let p = [0.1, 0.2, 0.3, 0.4];
        let scores = ClassificationScores::compute(&y, &p);

        assert_eq!(scores.precision, 0.0);
        assert_eq!(scores.recall, 0.0);
        assert_eq!(scores.f1_score, 0.0);
        assert_eq!(scores.accuracy, 0.5);
    }

    #[test]
    fn test_single_class_auc() {
        assert_eq!(roc_auc(&[0, 0, 0], &[0.1, 0.7, 0.3]), UNDEFINED_AUC);
        assert_eq!(roc_auc(&[1, 1], &[0.9, 0.2]), UNDEFINED_AUC);
    }

    #[test]
    fn test_auc_with_ties() {
        // one positive tied with one negative, one positive above both
        let y = [0, 1, 1];
        let p = [0.5, 0.5, 0.9];
        assert!((roc_auc(&y, &p) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_scores() {
        let y = [1, 1, 0, 0];
        let p = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &p), 0.0);
    }

    #[test]
    fn test_confusion_counts() {
        let cm = ConfusionMatrix::from_predictions(&[1, 0, 1, 0], &[1, 1, 0, 0]);
        assert_eq!(cm.true_positives, 1);
        assert_eq!(cm.false_positives, 1);
        assert_eq!(cm.false_negatives, 1);
        assert_eq!(cm.true_negatives, 1);
        assert_eq!(cm.total(), 4);
    }
}
