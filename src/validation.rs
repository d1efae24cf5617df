//! Data-leakage diagnostics.
//!
//! The framework inspects a dataset (and optionally the partition a split
//! strategy would produce) and reports severity-tagged findings. It never
//! blocks an evaluation; callers decide what to do with the report.

use crate::dataset::Dataset;
use crate::models::StandardScaler;
use crate::split::{ScalerScope, SplitStrategy};
use crate::types::{LeakageKind, Severity, ValidationIssue, ValidationReport};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Limits used by the leakage checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeakageThresholds {
    /// Single-feature split accuracy above which a feature is a perfect predictor
    ///
    /// Both plain and balanced accuracy must exceed it, so predicting the
    /// majority class of a skewed dataset never counts.
    pub perfect_accuracy: f64,
    /// |correlation| with the label flagged as critical
    pub critical_correlation: f64,
    /// |correlation| with the label flagged as a warning
    pub warning_correlation: f64,
    /// Tolerance on |mean| and |std - 1| for a feature to look standardized
    pub standardized_tolerance: f64,
    /// Share of standardized features that triggers the statistical warning
    pub standardized_share: f64,
}

impl Default for LeakageThresholds {
    fn default() -> Self {
        Self {
            perfect_accuracy: 0.99,
            critical_correlation: 0.95,
            warning_correlation: 0.9,
            standardized_tolerance: 0.01,
            standardized_share: 0.5,
        }
    }
}

/// Best single-threshold rule found for one feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StumpScore {
    pub threshold: f64,
    pub accuracy: f64,
    pub balanced_accuracy: f64,
}

/// Runs the leakage checks and scores the findings
#[derive(Debug, Clone)]
pub struct ValidationFramework {
    thresholds: LeakageThresholds,
    test_fraction: f64,
    seed: u64,
}

impl Default for ValidationFramework {
    fn default() -> Self {
        Self::new(LeakageThresholds::default(), 0.2, 42)
    }
}

impl ValidationFramework {
    /// `test_fraction` and `seed` are used to rebuild partitions for pipeline audits
    pub fn new(thresholds: LeakageThresholds, test_fraction: f64, seed: u64) -> Self {
        Self {
            thresholds,
            test_fraction,
            seed,
        }
    }

    pub fn thresholds(&self) -> &LeakageThresholds {
        &self.thresholds
    }

    /// Temporal, feature and statistical checks on a dataset
    pub fn validate(&self, dataset: &Dataset) -> ValidationReport {
        let mut issues = self.check_temporal_leakage(dataset);
        issues.extend(self.check_feature_leakage(dataset));
        issues.extend(self.check_statistical_leakage(dataset));
        self.report(dataset, issues)
    }

    /// Dataset checks plus an audit of the partition `strategy` would build
    pub fn validate_pipeline(
        &self,
        dataset: &Dataset,
        strategy: SplitStrategy,
    ) -> ValidationReport {
        let mut issues = self.check_temporal_leakage(dataset);
        issues.extend(self.check_feature_leakage(dataset));
        issues.extend(self.check_statistical_leakage(dataset));
        issues.extend(self.check_pipeline(dataset, strategy));
        self.report(dataset, issues)
    }

    /// Flags a time column that is not in ascending order
    pub fn check_temporal_leakage(&self, dataset: &Dataset) -> Vec<ValidationIssue> {
        let (column, times) = match (&dataset.time_column, dataset.time_values()) {
            (Some(column), Some(times)) => (column, times),
            _ => {
                return vec![ValidationIssue::new(
                    Severity::Info,
                    LeakageKind::Temporal,
                    "no time column found; temporal ordering not checked",
                )]
            }
        };

        let inversions = times.windows(2).filter(|w| w[1] < w[0]).count();
        if inversions == 0 {
            return Vec::new();
        }

        vec![ValidationIssue::new(
            Severity::Critical,
            LeakageKind::Temporal,
            format!(
                "time column '{}' is not sorted ({} out-of-order rows); a positional split mixes future rows into training",
                column, inversions
            ),
        )
        .with_feature(column.clone())
        .with_value(inversions as f64)]
    }

    /// Flags perfect single-feature predictors and features highly correlated with the label
    pub fn check_feature_leakage(&self, dataset: &Dataset) -> Vec<ValidationIssue> {
        if !dataset.has_both_classes() {
            return vec![ValidationIssue::new(
                Severity::Info,
                LeakageKind::Feature,
                "single-class labels; feature leakage not checked",
            )];
        }

        let t = self.thresholds;
        let labels = &dataset.labels;

        let per_feature: Vec<Vec<ValidationIssue>> = (0..dataset.feature_count())
            .into_par_iter()
            .map(|idx| {
                let name = &dataset.feature_names[idx];
                let values = dataset.column(idx);

                let stump = best_stump(&values, labels);
                if stump.accuracy > t.perfect_accuracy
                    && stump.balanced_accuracy > t.perfect_accuracy
                {
                    return vec![ValidationIssue::new(
                        Severity::Critical,
                        LeakageKind::Feature,
                        format!(
                            "'{}' is a perfect predictor: threshold {:.4} gives {:.2}% accuracy",
                            name,
                            stump.threshold,
                            stump.accuracy * 100.0
                        ),
                    )
                    .with_feature(name.clone())
                    .with_value(stump.accuracy)];
                }

                let Some(corr) = label_correlation(&values, labels) else {
                    return Vec::new();
                };
                let severity = if corr.abs() > t.critical_correlation {
                    Severity::Critical
                } else if corr.abs() > t.warning_correlation {
                    Severity::Warning
                } else {
                    return Vec::new();
                };
                vec![ValidationIssue::new(
                    severity,
                    LeakageKind::Feature,
                    format!("'{}' correlates with the label at {:.3}", name, corr),
                )
                .with_feature(name.clone())
                .with_value(corr)]
            })
            .collect();

        per_feature.into_iter().flatten().collect()
    }

    /// Flags datasets whose features already look globally standardized
    pub fn check_statistical_leakage(&self, dataset: &Dataset) -> Vec<ValidationIssue> {
        let n_features = dataset.feature_count();
        if n_features == 0 || dataset.is_empty() {
            return Vec::new();
        }

        let all_rows: Vec<usize> = (0..dataset.len()).collect();
        let scaler = StandardScaler::fit(&dataset.rows, &all_rows);
        let tol = self.thresholds.standardized_tolerance;
        let standardized = scaler
            .mean()
            .iter()
            .zip(scaler.scale())
            .filter(|(mean, std)| mean.abs() < tol && (*std - 1.0).abs() < tol)
            .count();

        let share = standardized as f64 / n_features as f64;
        debug!(dataset = %dataset.name, standardized, n_features, "Standardization check");
        if share < self.thresholds.standardized_share {
            return Vec::new();
        }

        vec![ValidationIssue::new(
            Severity::Warning,
            LeakageKind::Statistical,
            format!(
                "{} of {} features already have zero mean and unit variance; scaling may have been fit before splitting",
                standardized, n_features
            ),
        )
        .with_value(share)]
    }

    /// Audits the partition and scaler scope of an evaluation strategy
    pub fn check_pipeline(
        &self,
        dataset: &Dataset,
        strategy: SplitStrategy,
    ) -> Vec<ValidationIssue> {
        let partition = match strategy.partition(dataset, self.test_fraction, self.seed) {
            Ok(partition) => partition,
            Err(e) => {
                return vec![ValidationIssue::new(
                    Severity::Info,
                    LeakageKind::Pipeline,
                    format!("{} partition could not be built: {}", strategy, e),
                )]
            }
        };

        let mut issues = Vec::new();

        match dataset.time_values() {
            Some(times) => {
                let latest_train = partition
                    .train
                    .iter()
                    .map(|&i| times[i])
                    .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                let earliest_test = partition
                    .test
                    .iter()
                    .map(|&i| times[i])
                    .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

                if let (Some(train_max), Some(test_min)) = (latest_train, earliest_test) {
                    if train_max > test_min {
                        let overlapping = partition
                            .train
                            .iter()
                            .filter(|&&i| times[i] > test_min)
                            .count();
                        issues.push(
                            ValidationIssue::new(
                                Severity::Critical,
                                LeakageKind::Pipeline,
                                format!(
                                    "{} split trains on {} rows later than the earliest test row",
                                    strategy, overlapping
                                ),
                            )
                            .with_value(overlapping as f64),
                        );
                    }
                }
            }
            None => issues.push(ValidationIssue::new(
                Severity::Info,
                LeakageKind::Pipeline,
                format!(
                    "{} split has no time column; train/test time overlap not checked",
                    strategy
                ),
            )),
        }

        if strategy.scaler_scope() == ScalerScope::AllRows {
            issues.push(
                ValidationIssue::new(
                    Severity::Critical,
                    LeakageKind::Pipeline,
                    format!(
                        "{} split fits the scaler on {} test rows",
                        strategy,
                        partition.test.len()
                    ),
                )
                .with_value(partition.test.len() as f64),
            );
        }

        issues
    }

    fn report(&self, dataset: &Dataset, issues: Vec<ValidationIssue>) -> ValidationReport {
        let report = ValidationReport::new(dataset.name.clone(), issues);
        info!(
            dataset = %report.dataset_name,
            score = report.score,
            critical = report.count(Severity::Critical),
            warnings = report.count(Severity::Warning),
            "Leakage validation complete"
        );
        report
    }
}

/// Best rule of the form `x > t` or `x <= t` predicting the positive class
///
/// Candidate thresholds sit between consecutive distinct values. The rule is
/// chosen by balanced accuracy so that predicting the majority class on a
/// skewed dataset never wins.
pub fn best_stump(values: &[f64], labels: &[u8]) -> StumpScore {
    let n = labels.len();
    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = n - positives;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let score = |pos_below: usize, neg_below: usize, threshold: f64| {
        // rule "x > t": positives above are hits, negatives below are hits
        let tp = positives - pos_below;
        let tn = neg_below;
        let rate = |hits: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            }
        };
        let above = StumpScore {
            threshold,
            accuracy: rate(tp + tn, n),
            balanced_accuracy: (rate(tp, positives) + rate(tn, negatives)) / 2.0,
        };
        // rule "x <= t" is the complement
        let below = StumpScore {
            threshold,
            accuracy: 1.0 - above.accuracy,
            balanced_accuracy: 1.0 - above.balanced_accuracy,
        };
        if below.balanced_accuracy > above.balanced_accuracy {
            below
        } else {
            above
        }
    };

    let first = order.first().map(|&i| values[i]).unwrap_or(0.0);
    let mut best = score(0, 0, first - 1.0);
    let (mut pos_below, mut neg_below) = (0, 0);

    for (k, &i) in order.iter().enumerate() {
        if labels[i] == 1 {
            pos_below += 1;
        } else {
            neg_below += 1;
        }
        let Some(&next) = order.get(k + 1) else {
            break;
        };
        if values[next] <= values[i] {
            continue;
        }
        let candidate = score(pos_below, neg_below, (values[i] + values[next]) / 2.0);
        if candidate.balanced_accuracy > best.balanced_accuracy {
            best = candidate;
        }
    }

    best
}

/// Pearson correlation between a feature and binary labels; `None` if either is constant
pub fn label_correlation(values: &[f64], labels: &[u8]) -> Option<f64> {
    let n = values.len() as f64;
    if values.is_empty() {
        return None;
    }
    let mean_x = values.iter().sum::<f64>() / n;
    let mean_y = labels.iter().map(|&y| f64::from(y)).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (&x, &y) in values.iter().zip(labels) {
        let dx = x - mean_x;
        let dy = f64::from(y) - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}
