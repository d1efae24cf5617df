//! Cache-backed metrics for the three reporting domains.
//!
//! One [`PerformanceCalculator`] is built at startup and shared with request
//! handlers. For each domain it serves a fresh cached record if one exists,
//! otherwise evaluates the primary dataset and its alternates in order, and
//! finally substitutes the fixed fallback record.

use crate::cache::MetricsCache;
use crate::config::{AppConfig, DomainsConfig, EvaluationConfig};
use crate::error::EvaluationError;
use crate::evaluator::{EvaluationRequest, PerformanceEvaluator};
use crate::fallback::fallback_record;
use crate::types::{AllPerformanceMetrics, Domain, MetricsRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a domain's record was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsOutcome {
    /// Fresh entry from the cache
    Cached(MetricsRecord),
    /// Evaluated now and written to the cache
    Computed(MetricsRecord),
    /// Evaluation failed; fixed estimate, not cached
    Fallback { record: MetricsRecord, reason: String },
}

impl MetricsOutcome {
    pub fn record(&self) -> &MetricsRecord {
        match self {
            MetricsOutcome::Cached(record) | MetricsOutcome::Computed(record) => record,
            MetricsOutcome::Fallback { record, .. } => record,
        }
    }

    pub fn into_record(self) -> MetricsRecord {
        match self {
            MetricsOutcome::Cached(record) | MetricsOutcome::Computed(record) => record,
            MetricsOutcome::Fallback { record, .. } => record,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, MetricsOutcome::Fallback { .. })
    }
}

/// Serves domain metrics through the shared cache
pub struct PerformanceCalculator {
    cache: Arc<MetricsCache>,
    evaluator: PerformanceEvaluator,
    domains: DomainsConfig,
    evaluation: EvaluationConfig,
}

impl PerformanceCalculator {
    /// Create a calculator over an already loaded cache
    pub fn new(config: &AppConfig, cache: Arc<MetricsCache>) -> Self {
        Self {
            cache,
            evaluator: PerformanceEvaluator::new(config),
            domains: config.domains.clone(),
            evaluation: config.evaluation.clone(),
        }
    }

    pub fn cache(&self) -> &MetricsCache {
        &self.cache
    }

    pub fn evaluator(&self) -> &PerformanceEvaluator {
        &self.evaluator
    }

    /// Request for a domain's primary dataset under the configured strategy
    pub fn request_for(&self, domain: Domain) -> EvaluationRequest {
        EvaluationRequest::for_domain(domain, self.domains.get(domain), &self.evaluation)
    }

    /// Dataset names tried for a domain, primary first
    pub fn dataset_candidates(&self, domain: Domain) -> Vec<String> {
        let domain_config = self.domains.get(domain);
        std::iter::once(domain_config.dataset.clone())
            .chain(domain_config.alternates.iter().cloned())
            .collect()
    }

    /// Metrics for a domain, with the path that produced them
    pub fn domain_outcome(&self, domain: Domain) -> MetricsOutcome {
        self.outcome_for(self.request_for(domain))
    }

    /// Like [`domain_outcome`](Self::domain_outcome) with an explicit request
    ///
    /// The request's dataset is tried first, then the domain's alternates.
    pub fn outcome_for(&self, request: EvaluationRequest) -> MetricsOutcome {
        let domain = request.domain;
        let mut names = vec![request.dataset_name.clone()];
        names.extend(
            self.dataset_candidates(domain)
                .into_iter()
                .filter(|n| *n != request.dataset_name),
        );

        let mut last_error: Option<EvaluationError> = None;
        for name in names {
            let request = request.clone().with_dataset(name);
            let key = request.cache_key();

            if let Some(record) = self.cache.get(&key) {
                return MetricsOutcome::Cached(record);
            }

            match self.evaluator.evaluate(&request) {
                Ok(record) => {
                    self.cache.put(&key, record.clone());
                    info!(domain = %domain, key = %key, "Metrics computed and cached");
                    return MetricsOutcome::Computed(record);
                }
                Err(e) if e.is_missing_data() => {
                    debug!(domain = %domain, dataset = %request.dataset_name, "Dataset missing, trying next candidate");
                    last_error = Some(e);
                }
                Err(e) => {
                    last_error = Some(e);
                    break;
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no dataset candidates".to_string());
        warn!(domain = %domain, reason = %reason, "Serving fallback metrics");

        MetricsOutcome::Fallback {
            record: fallback_record(domain, &request.dataset_name),
            reason,
        }
    }

    /// Metrics for a domain; always returns a well-formed record
    pub fn domain_metrics(&self, domain: Domain) -> MetricsRecord {
        self.domain_outcome(domain).into_record()
    }

    /// The document served to dashboards
    pub fn get_all_performance_metrics(&self) -> AllPerformanceMetrics {
        AllPerformanceMetrics {
            fraud_detection: self.domain_metrics(Domain::Fraud),
            sentiment_analysis: self.domain_metrics(Domain::Sentiment),
            customer_attrition: self.domain_metrics(Domain::Attrition),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::SplitStrategy;
    use std::fmt::Write as _;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        calculator: PerformanceCalculator,
        data_root: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let data_root = dir.path().join("data");
        std::fs::create_dir_all(&data_root).unwrap();

        let mut config = AppConfig::default();
        config.data.root = data_root.clone();
        config.cache.path = dir.path().join("cache.json");
        config.evaluation.n_estimators = 10;
        config.evaluation.max_depth = 5;

        let cache = Arc::new(MetricsCache::load(&config.cache.path));
        Fixture {
            calculator: PerformanceCalculator::new(&config, cache),
            data_root,
            _dir: dir,
        }
    }

    fn write_churn_csv(root: &Path, name: &str) {
        let mut csv = String::from("tenure,monthly_charges,Churn\n");
        for i in 0..80 {
            let churn = i % 3 == 0;
            let tenure = if churn { 2 + i % 5 } else { 30 + i % 20 };
            writeln!(csv, "{},{}.5,{}", tenure, 40 + i % 30, if churn { "Yes" } else { "No" })
                .unwrap();
        }
        std::fs::write(root.join(format!("{}.csv", name)), csv).unwrap();
    }

    #[test]
    fn test_missing_data_falls_back() {
        let f = fixture();
        let outcome = f.calculator.domain_outcome(Domain::Fraud);

        assert!(outcome.is_degraded());
        let record = outcome.record();
        assert_eq!(record.model_type, "Random Forest (fallback)");
        assert_eq!(record.dataset_name, "creditcard");
        assert!(f.calculator.cache().is_empty());
    }

    #[test]
    fn test_computed_then_cached() {
        let f = fixture();
        write_churn_csv(&f.data_root, "customer_churn");

        let first = f.calculator.domain_outcome(Domain::Attrition);
        assert!(matches!(first, MetricsOutcome::Computed(_)));
        assert_eq!(first.record().split_strategy, Some(SplitStrategy::TemporalSecure));

        let second = f.calculator.domain_outcome(Domain::Attrition);
        assert!(matches!(second, MetricsOutcome::Cached(_)));
        assert_eq!(first.record(), second.record());
        assert_eq!(f.calculator.cache().len(), 1);
    }

    #[test]
    fn test_alternate_dataset_used_when_primary_missing() {
        let f = fixture();
        write_churn_csv(&f.data_root, "telco_churn");

        let outcome = f.calculator.domain_outcome(Domain::Attrition);
        assert!(matches!(outcome, MetricsOutcome::Computed(_)));
        assert_eq!(outcome.record().dataset_name, "telco_churn");
    }

    #[test]
    fn test_computation_error_skips_alternates() {
        let f = fixture();
        // no label column in the primary dataset
        std::fs::write(f.data_root.join("customer_churn.csv"), "a,b\n1,2\n3,4\n").unwrap();
        write_churn_csv(&f.data_root, "telco_churn");

        match f.calculator.domain_outcome(Domain::Attrition) {
            MetricsOutcome::Fallback { record, reason } => {
                assert_eq!(record.model_type, "Random Forest (estimated)");
                assert!(reason.contains("label"));
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_test_fraction_falls_back() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.data.root = dir.path().to_path_buf();
        config.cache.path = dir.path().join("cache.json");
        config.evaluation.test_fraction = 1.5;
        write_churn_csv(dir.path(), "customer_churn");

        let cache = Arc::new(MetricsCache::load(&config.cache.path));
        let calculator = PerformanceCalculator::new(&config, cache);

        match calculator.domain_outcome(Domain::Attrition) {
            MetricsOutcome::Fallback { reason, .. } => assert!(reason.contains("test fraction")),
            other => panic!("expected fallback, got {:?}", other),
        }
        assert!(calculator.cache().is_empty());
    }

    #[test]
    fn test_all_metrics_document() {
        let f = fixture();
        write_churn_csv(&f.data_root, "customer_churn");

        let all = f.calculator.get_all_performance_metrics();
        assert!(all.fraud_detection.is_estimate());
        assert!(all.sentiment_analysis.is_estimate());
        assert!(!all.customer_attrition.is_estimate());

        let json = serde_json::to_value(&all).unwrap();
        assert!(json["customer_attrition"]["churn_rate"].is_number());
        assert!(json["sentiment_analysis"]["sentiment_distribution"]["positive"].is_number());
        assert!(json["updated_at"].is_string());
    }

    #[test]
    fn test_strategies_cached_separately() {
        let f = fixture();
        write_churn_csv(&f.data_root, "customer_churn");

        let secure = f.calculator.request_for(Domain::Attrition);
        let leaky = secure.clone().with_strategy(SplitStrategy::NaiveLeaky);
        f.calculator.outcome_for(secure);
        f.calculator.outcome_for(leaky);

        assert_eq!(f.calculator.cache().len(), 2);
    }
}
