//! Classifiers trained during evaluation

pub mod forest;
pub mod logistic;
pub mod scaler;
pub mod tree;

pub use forest::RandomForest;
pub use logistic::LogisticRegression;
pub use scaler::StandardScaler;

use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A binary classifier producing positive-class probabilities
pub trait Classifier: Send + Sync {
    /// Fit on row-major features with one weight per sample
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8], weights: &[f64]) -> Result<(), EvaluationError>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &[Vec<f64>]) -> Vec<f64>;
}

/// Algorithm used for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    RandomForest,
    LogisticRegression,
}

impl ModelKind {
    /// Human-readable label stored in `model_type`
    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::LogisticRegression => "Logistic Regression",
        }
    }

    pub fn build(&self, settings: &ModelSettings) -> Box<dyn Classifier> {
        match self {
            ModelKind::RandomForest => Box::new(RandomForest::new(settings)),
            ModelKind::LogisticRegression => Box::new(LogisticRegression::new(settings)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed hyperparameters shared by all models
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(12),
            min_samples_split: 2,
            seed: 42,
            max_iter: 500,
            learning_rate: 0.5,
            l2: 1e-4,
        }
    }
}

/// Per-sample weights `n / (2 * n_class)`, all ones when a class is absent
pub fn balanced_sample_weights(y: &[u8]) -> Vec<f64> {
    let n = y.len() as f64;
    let n_pos = y.iter().filter(|&&v| v == 1).count() as f64;
    let n_neg = n - n_pos;
    if n_pos == 0.0 || n_neg == 0.0 {
        return vec![1.0; y.len()];
    }

    let w_pos = n / (2.0 * n_pos);
    let w_neg = n / (2.0 * n_neg);
    y.iter()
        .map(|&v| if v == 1 { w_pos } else { w_neg })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_weights() {
        let w = balanced_sample_weights(&[1, 0, 0, 0]);
        assert_eq!(w, vec![2.0, 2.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0]);

        let total_pos: f64 = w[..1].iter().sum();
        let total_neg: f64 = w[1..].iter().sum();
        assert!((total_pos - total_neg).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_weights_are_uniform() {
        assert_eq!(balanced_sample_weights(&[0, 0]), vec![1.0, 1.0]);
    }

    #[test]
    fn test_model_labels() {
        assert_eq!(ModelKind::RandomForest.label(), "Random Forest");
        assert_eq!(ModelKind::default(), ModelKind::RandomForest);
        let kind: ModelKind = serde_json::from_str("\"logistic_regression\"").unwrap();
        assert_eq!(kind, ModelKind::LogisticRegression);
    }
}
