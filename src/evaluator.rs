//! Model evaluation: dataset in, metrics record out

use crate::cache::cache_key;
use crate::config::{AppConfig, DomainConfig, EvaluationConfig};
use crate::dataset::Dataset;
use crate::error::EvaluationError;
use crate::metrics::ClassificationScores;
use crate::models::{balanced_sample_weights, ModelKind, ModelSettings, StandardScaler};
use crate::split::SplitStrategy;
use crate::types::{Domain, DomainRate, MetricsRecord};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// What to evaluate and how
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub domain: Domain,
    pub dataset_name: String,
    pub label_candidates: Vec<String>,
    pub model: ModelKind,
    /// Row cap; larger datasets are downsampled deterministically
    pub sample_size: usize,
    pub strategy: SplitStrategy,
}

impl EvaluationRequest {
    /// Request for a domain's primary dataset
    pub fn for_domain(
        domain: Domain,
        domain_config: &DomainConfig,
        evaluation: &EvaluationConfig,
    ) -> Self {
        Self {
            domain,
            dataset_name: domain_config.dataset.clone(),
            label_candidates: domain_config.label_candidates.clone(),
            model: domain_config.model,
            sample_size: evaluation.sample_size,
            strategy: evaluation.strategy,
        }
    }

    /// Same request against another dataset
    pub fn with_dataset(mut self, dataset_name: impl Into<String>) -> Self {
        self.dataset_name = dataset_name.into();
        self
    }

    pub fn with_strategy(mut self, strategy: SplitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Key under which the result is cached
    pub fn cache_key(&self) -> String {
        cache_key(&self.dataset_name, self.strategy.as_str(), self.sample_size)
    }
}

/// Trains one model per request and scores it on a held-out partition
#[derive(Debug, Clone)]
pub struct PerformanceEvaluator {
    data_root: PathBuf,
    time_candidates: Vec<String>,
    test_fraction: f64,
    seed: u64,
    settings: ModelSettings,
}

impl PerformanceEvaluator {
    /// Create an evaluator from configuration
    pub fn new(config: &AppConfig) -> Self {
        Self {
            data_root: config.data.root.clone(),
            time_candidates: config.data.time_column_candidates.clone(),
            test_fraction: config.evaluation.test_fraction,
            seed: config.evaluation.seed,
            settings: config.evaluation.model_settings(),
        }
    }

    /// Get the data root
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Conventional locations of a dataset, in search order
    pub fn dataset_paths(&self, dataset_name: &str) -> Vec<PathBuf> {
        vec![
            self.data_root
                .join(dataset_name)
                .join(format!("{}_processed.csv", dataset_name)),
            self.data_root
                .join(dataset_name)
                .join(format!("{}.csv", dataset_name)),
            self.data_root.join(format!("{}.csv", dataset_name)),
        ]
    }

    /// First existing path for a dataset
    pub fn resolve_dataset(&self, dataset_name: &str) -> Result<PathBuf, EvaluationError> {
        let searched = self.dataset_paths(dataset_name);
        searched
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| EvaluationError::DatasetNotFound {
                dataset: dataset_name.to_string(),
                searched,
            })
    }

    /// Locate and parse the dataset a request names
    pub fn load_dataset(
        &self,
        dataset_name: &str,
        label_candidates: &[String],
    ) -> Result<Dataset, EvaluationError> {
        let path = self.resolve_dataset(dataset_name)?;
        Dataset::from_csv(&path, dataset_name, label_candidates, &self.time_candidates)
    }

    /// Load the request's dataset and evaluate it
    pub fn evaluate(&self, request: &EvaluationRequest) -> Result<MetricsRecord, EvaluationError> {
        let dataset = self.load_dataset(&request.dataset_name, &request.label_candidates)?;
        self.evaluate_dataset(request, &dataset)
    }

    /// Downsample, split, scale, fit and score an already loaded dataset
    pub fn evaluate_dataset(
        &self,
        request: &EvaluationRequest,
        dataset: &Dataset,
    ) -> Result<MetricsRecord, EvaluationError> {
        let start = Instant::now();
        let strategy = request.strategy;

        let sampled = dataset.downsample(request.sample_size, strategy.sampling_mode(self.seed));
        let partition = strategy.partition(&sampled, self.test_fraction, self.seed)?;

        // the time column orders the split but is not a model input
        let features = sampled.model_rows()?;
        let scaler =
            StandardScaler::fit(&features, &partition.scaler_rows(strategy.scaler_scope()));
        let x_train: Vec<Vec<f64>> = partition
            .train
            .iter()
            .map(|&i| scaler.transform_row(&features[i]))
            .collect();
        let y_train: Vec<u8> = partition.train.iter().map(|&i| sampled.labels[i]).collect();
        let x_test: Vec<Vec<f64>> = partition
            .test
            .iter()
            .map(|&i| scaler.transform_row(&features[i]))
            .collect();
        let y_test: Vec<u8> = partition.test.iter().map(|&i| sampled.labels[i]).collect();

        let weights = if strategy.balances_classes() {
            balanced_sample_weights(&y_train)
        } else {
            vec![1.0; y_train.len()]
        };

        debug!(
            dataset = %request.dataset_name,
            strategy = %strategy,
            train = y_train.len(),
            test = y_test.len(),
            features = scaler.mean().len(),
            "Partitioned dataset"
        );

        let mut model = request.model.build(&self.settings);
        model.fit(&x_train, &y_train, &weights)?;
        let proba = model.predict_proba(&x_test);
        let scores = ClassificationScores::compute(&y_test, &proba);

        info!(
            domain = %request.domain,
            dataset = %request.dataset_name,
            model = %request.model,
            strategy = %strategy,
            samples = sampled.len(),
            accuracy = scores.accuracy,
            auc_roc = scores.auc_roc,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Evaluation complete"
        );

        Ok(MetricsRecord::new(
            request.dataset_name.clone(),
            sampled.len(),
            DomainRate::from_label_counts(
                request.domain,
                sampled.positive_count(),
                sampled.neutral_count(),
                sampled.len(),
            ),
            scores,
            request.model.label(),
        )
        .with_split_strategy(strategy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::fmt::Write as _;
    use tempfile::TempDir;

    fn config_with_root(root: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.data.root = root.to_path_buf();
        config.evaluation.n_estimators = 15;
        config.evaluation.max_depth = 6;
        config
    }

    fn fraud_request(strategy: SplitStrategy) -> EvaluationRequest {
        let config = AppConfig::default();
        EvaluationRequest::for_domain(Domain::Fraud, &config.domains.fraud, &config.evaluation)
            .with_strategy(strategy)
    }

    /// Time-ordered transactions where V1 separates the classes
    fn write_fraud_csv(root: &Path, name: &str, rows: usize) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut csv = String::from("Time,V1,V2,Amount,Class\n");
        for i in 0..rows {
            let class = u8::from(i % 4 == 0);
            let center = if class == 1 { 3.0 } else { -3.0 };
            let v1: f64 = center + rng.gen_range(-1.0..1.0);
            let v2: f64 = rng.gen_range(-1.0..1.0);
            let amount: f64 = rng.gen_range(1.0..500.0);
            writeln!(csv, "{},{:.4},{:.4},{:.2},{}", i * 10, v1, v2, amount, class).unwrap();
        }
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{}_processed.csv", name)), csv).unwrap();
    }

    #[test]
    fn test_dataset_path_order() {
        let evaluator = PerformanceEvaluator::new(&config_with_root(Path::new("/data")));
        let paths = evaluator.dataset_paths("creditcard");
        assert_eq!(paths[0], Path::new("/data/creditcard/creditcard_processed.csv"));
        assert_eq!(paths[1], Path::new("/data/creditcard/creditcard.csv"));
        assert_eq!(paths[2], Path::new("/data/creditcard.csv"));
    }

    #[test]
    fn test_missing_dataset_is_reported() {
        let dir = TempDir::new().unwrap();
        let evaluator = PerformanceEvaluator::new(&config_with_root(dir.path()));

        let err = evaluator
            .evaluate(&fraud_request(SplitStrategy::TemporalSecure))
            .unwrap_err();
        assert!(err.is_missing_data());
    }

    #[test]
    fn test_evaluates_csv_with_both_strategies() {
        let dir = TempDir::new().unwrap();
        write_fraud_csv(dir.path(), "creditcard", 200);
        let evaluator = PerformanceEvaluator::new(&config_with_root(dir.path()));

        for strategy in [SplitStrategy::NaiveLeaky, SplitStrategy::TemporalSecure] {
            let record = evaluator.evaluate(&fraud_request(strategy)).unwrap();

            assert_eq!(record.dataset_name, "creditcard");
            assert_eq!(record.total_samples, 200);
            assert_eq!(record.model_type, "Random Forest");
            assert_eq!(record.split_strategy, Some(strategy));
            assert_eq!(record.rate, DomainRate::Fraud { fraud_rate: 25.0 });
            assert!(!record.is_estimate());
            assert!(record.accuracy > 0.9, "accuracy {}", record.accuracy);
            assert!(record.auc_roc > 0.9, "auc {}", record.auc_roc);
        }
    }

    #[test]
    fn test_sample_size_caps_rows() {
        let dir = TempDir::new().unwrap();
        write_fraud_csv(dir.path(), "creditcard", 300);
        let evaluator = PerformanceEvaluator::new(&config_with_root(dir.path()));

        let mut request = fraud_request(SplitStrategy::TemporalSecure);
        request.sample_size = 100;
        let record = evaluator.evaluate(&request).unwrap();
        assert_eq!(record.total_samples, 100);
    }

    #[test]
    fn test_single_class_dataset_scores_half_auc() {
        let evaluator = PerformanceEvaluator::new(&AppConfig::default());
        let dataset = Dataset::from_columns(
            "all_legit",
            vec![
                ("Time".to_string(), (0..50).map(f64::from).collect()),
                ("V1".to_string(), (0..50).map(|i| f64::from(i % 5)).collect()),
            ],
            vec![0; 50],
            Some("Time"),
        )
        .unwrap();

        for strategy in [SplitStrategy::NaiveLeaky, SplitStrategy::TemporalSecure] {
            let record = evaluator
                .evaluate_dataset(&fraud_request(strategy), &dataset)
                .unwrap();
            assert_eq!(record.auc_roc, 0.5);
            assert_eq!(record.precision, 0.0);
        }
    }

    #[test]
    fn test_logistic_model_label() {
        let dir = TempDir::new().unwrap();
        write_fraud_csv(dir.path(), "creditcard", 120);
        let evaluator = PerformanceEvaluator::new(&config_with_root(dir.path()));

        let mut request = fraud_request(SplitStrategy::NaiveLeaky);
        request.model = ModelKind::LogisticRegression;
        let record = evaluator.evaluate(&request).unwrap();
        assert_eq!(record.model_type, "Logistic Regression");
        assert!(record.accuracy > 0.9);
    }

    #[test]
    fn test_time_only_dataset_has_no_model_features() {
        let evaluator = PerformanceEvaluator::new(&AppConfig::default());
        let dataset = Dataset::from_columns(
            "clock_only",
            vec![("Time".to_string(), (0..40).map(f64::from).collect())],
            (0..40).map(|i| u8::from(i >= 30)).collect(),
            Some("Time"),
        )
        .unwrap();

        let err = evaluator
            .evaluate_dataset(&fraud_request(SplitStrategy::TemporalSecure), &dataset)
            .unwrap_err();
        assert!(matches!(err, EvaluationError::NoFeatures(_)));
    }

    #[test]
    fn test_sentiment_record_reports_neutral_share() {
        let dir = TempDir::new().unwrap();
        let mut csv = String::from("positive_terms,negative_terms,sentiment\n");
        for i in 0..60 {
            let (pos, neg, label) = match i % 3 {
                0 => (4, 0, "positive"),
                1 => (0, 4, "negative"),
                _ => (1, 1, "neutral"),
            };
            writeln!(csv, "{},{},{}", pos + i % 2, neg + i % 2, label).unwrap();
        }
        std::fs::write(dir.path().join("financial_sentiment.csv"), csv).unwrap();

        let config = config_with_root(dir.path());
        let evaluator = PerformanceEvaluator::new(&config);
        let request = EvaluationRequest::for_domain(
            Domain::Sentiment,
            &config.domains.sentiment,
            &config.evaluation,
        );
        let record = evaluator.evaluate(&request).unwrap();

        match record.rate {
            DomainRate::Sentiment {
                sentiment_distribution: d,
            } => {
                assert!((d.positive - 100.0 / 3.0).abs() < 1e-9);
                assert!((d.negative - 100.0 / 3.0).abs() < 1e-9);
                assert!((d.neutral - 100.0 / 3.0).abs() < 1e-9);
            }
            other => panic!("unexpected rate {:?}", other),
        }
    }

    #[test]
    fn test_cache_key_includes_strategy_and_budget() {
        let request = fraud_request(SplitStrategy::NaiveLeaky);
        assert_eq!(request.cache_key(), "creditcard_naive_leaky_10000");
    }
}
