//! Train/test partitioning strategies.
//!
//! [`SplitStrategy::NaiveLeaky`] is the baseline path: a stratified random
//! split whose scaler is fit on every row, train and test together. It leaks
//! test statistics into preprocessing and is kept so the validation framework
//! has a known-bad pipeline to detect. [`SplitStrategy::TemporalSecure`] sorts
//! by the time column and fits preprocessing on the training rows only.

use crate::dataset::{Dataset, SamplingMode};
use crate::error::EvaluationError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Minimum rows each partition must hold
pub const MIN_PARTITION_ROWS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Stratified random split, scaler fit on train+test
    NaiveLeaky,
    /// Time-ordered split (when a time column exists), scaler fit on train only
    #[default]
    TemporalSecure,
}

/// Rows used to fit the feature scaler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalerScope {
    AllRows,
    TrainOnly,
}

impl SplitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitStrategy::NaiveLeaky => "naive_leaky",
            SplitStrategy::TemporalSecure => "temporal_secure",
        }
    }

    pub fn scaler_scope(&self) -> ScalerScope {
        match self {
            SplitStrategy::NaiveLeaky => ScalerScope::AllRows,
            SplitStrategy::TemporalSecure => ScalerScope::TrainOnly,
        }
    }

    /// How oversized datasets are downsampled before splitting
    pub fn sampling_mode(&self, seed: u64) -> SamplingMode {
        match self {
            SplitStrategy::NaiveLeaky => SamplingMode::Random { seed },
            SplitStrategy::TemporalSecure => SamplingMode::Stride,
        }
    }

    /// Balanced class weights are applied on the secure path
    pub fn balances_classes(&self) -> bool {
        matches!(self, SplitStrategy::TemporalSecure)
    }

    /// Partition dataset rows into train and test indices
    pub fn partition(
        &self,
        dataset: &Dataset,
        test_fraction: f64,
        seed: u64,
    ) -> Result<Partition, EvaluationError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(EvaluationError::InvalidTestFraction(test_fraction));
        }
        let partition = match (self, dataset.time_values()) {
            (SplitStrategy::TemporalSecure, Some(times)) => temporal_split(&times, test_fraction),
            _ => stratified_split(&dataset.labels, test_fraction, seed),
        };

        let smallest = partition.train.len().min(partition.test.len());
        if smallest < MIN_PARTITION_ROWS {
            return Err(EvaluationError::InsufficientData {
                needed: 2 * MIN_PARTITION_ROWS,
                got: dataset.len(),
            });
        }
        Ok(partition)
    }
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive_leaky" | "naive" | "leaky" => Ok(SplitStrategy::NaiveLeaky),
            "temporal_secure" | "temporal" | "secure" => Ok(SplitStrategy::TemporalSecure),
            other => Err(format!("unknown split strategy '{}'", other)),
        }
    }
}

/// Train and test row indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Partition {
    /// Indices the scaler is fit on under the given scope
    pub fn scaler_rows(&self, scope: ScalerScope) -> Vec<usize> {
        match scope {
            ScalerScope::TrainOnly => self.train.clone(),
            ScalerScope::AllRows => {
                let mut rows: Vec<usize> = self.train.iter().chain(&self.test).copied().collect();
                rows.sort_unstable();
                rows
            }
        }
    }
}

/// Number of test rows for a partition of `n`, never the whole set
fn test_count(n: usize, test_fraction: f64) -> usize {
    let count = (n as f64 * test_fraction).round() as usize;
    count.min(n.saturating_sub(1))
}

/// Sort by time ascending and hold out the latest rows
fn temporal_split(times: &[f64], test_fraction: f64) -> Partition {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| times[a].partial_cmp(&times[b]).unwrap_or(Ordering::Equal));

    let n_test = test_count(order.len(), test_fraction);
    let test = order.split_off(order.len() - n_test);
    Partition { train: order, test }
}

/// Shuffle each class with a fixed seed and hold out the same fraction of each
fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> Partition {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut idx: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        if idx.is_empty() {
            continue;
        }
        idx.shuffle(&mut rng);
        let n_test = ((idx.len() as f64 * test_fraction).round() as usize).min(idx.len());
        test.extend_from_slice(&idx[..n_test]);
        train.extend_from_slice(&idx[n_test..]);
    }

    // a class too small to contribute a test row can leave test empty
    if test.is_empty() && train.len() > 1 {
        let n_test = test_count(train.len(), test_fraction).max(1);
        train.shuffle(&mut rng);
        test = train.split_off(train.len() - n_test);
    }

    train.sort_unstable();
    test.sort_unstable();
    Partition { train, test }
}
