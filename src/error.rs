//! Error types for evaluation and cache persistence.

use std::path::PathBuf;

/// Errors raised while turning a dataset into a metrics record.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// None of the conventional paths for the dataset exist.
    #[error("dataset '{dataset}' not found (searched {searched:?})")]
    DatasetNotFound {
        dataset: String,
        searched: Vec<PathBuf>,
    },
    /// CSV parsing or column conversion failed.
    #[error("dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
    /// No label column matched the candidate list.
    #[error("dataset '{dataset}' has no label column (tried {candidates:?})")]
    MissingLabel {
        dataset: String,
        candidates: Vec<String>,
    },
    /// The dataset has no usable rows.
    #[error("dataset '{0}' is empty")]
    EmptyDataset(String),
    /// The dataset has no numeric feature columns.
    #[error("dataset '{0}' has no numeric feature columns")]
    NoFeatures(String),
    /// A partition ended up too small to fit or score a model.
    #[error("insufficient data: need at least {needed} rows, got {got}")]
    InsufficientData { needed: usize, got: usize },
    /// The held-out share is not strictly between 0 and 1.
    #[error("test fraction must be between 0 and 1, got {0}")]
    InvalidTestFraction(f64),
    /// Model fitting failed.
    #[error("model error: {0}")]
    Model(String),
}

impl EvaluationError {
    /// Whether the error means the data was never found, as opposed to a failed computation.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, EvaluationError::DatasetNotFound { .. })
    }
}

/// Errors raised while persisting the metrics cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_classification() {
        let missing = EvaluationError::DatasetNotFound {
            dataset: "creditcard".to_string(),
            searched: vec![PathBuf::from("data/creditcard.csv")],
        };
        assert!(missing.is_missing_data());
        assert!(!EvaluationError::EmptyDataset("x".to_string()).is_missing_data());
        assert!(missing.to_string().contains("creditcard"));
    }
}
