//! Configuration management for the metrics service

use crate::models::{ModelKind, ModelSettings};
use crate::split::SplitStrategy;
use crate::types::Domain;
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub domains: DomainsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dataset location configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Directory holding `<name>/<name>_processed.csv` datasets
    #[serde(default = "default_data_root")]
    pub root: PathBuf,
    /// Column names tried, in order, for the temporal split
    #[serde(default = "default_time_columns")]
    pub time_column_candidates: Vec<String>,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_time_columns() -> Vec<String> {
    to_strings(&["Time", "time", "timestamp", "TransactionDT", "step"])
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: default_data_root(),
            time_column_candidates: default_time_columns(),
        }
    }
}

/// Metrics cache configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// JSON file backing the cache
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("performance_cache.json")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

/// Model training configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EvaluationConfig {
    /// Row cap per evaluation
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Trees in each random forest
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    /// Maximum tree depth (0 = unlimited)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    /// Share of rows held out for scoring
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for sampling, splitting and model fitting
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Partitioning strategy: "naive_leaky" or "temporal_secure"
    #[serde(default)]
    pub strategy: SplitStrategy,
}

fn default_sample_size() -> usize {
    10_000
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_depth() -> usize {
    12
}

fn default_min_samples_split() -> usize {
    2
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            strategy: SplitStrategy::default(),
        }
    }
}

impl EvaluationConfig {
    /// Hyperparameters handed to the models
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            n_estimators: self.n_estimators,
            max_depth: (self.max_depth > 0).then_some(self.max_depth),
            min_samples_split: self.min_samples_split,
            seed: self.seed,
            ..ModelSettings::default()
        }
    }
}

/// Dataset and model choice for one domain
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DomainConfig {
    /// Primary dataset name
    pub dataset: String,
    /// Datasets tried, in order, when the primary one is missing
    #[serde(default)]
    pub alternates: Vec<String>,
    /// Label column names tried, in order
    pub label_candidates: Vec<String>,
    #[serde(default)]
    pub model: ModelKind,
}

/// Per-domain configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DomainsConfig {
    #[serde(default = "default_fraud")]
    pub fraud: DomainConfig,
    #[serde(default = "default_sentiment")]
    pub sentiment: DomainConfig,
    #[serde(default = "default_attrition")]
    pub attrition: DomainConfig,
}

fn default_fraud() -> DomainConfig {
    DomainConfig {
        dataset: "creditcard".to_string(),
        alternates: to_strings(&["paysim", "ieee_cis"]),
        label_candidates: to_strings(&["Class", "is_fraud", "isFraud", "fraud", "label"]),
        model: ModelKind::RandomForest,
    }
}

fn default_sentiment() -> DomainConfig {
    DomainConfig {
        dataset: "financial_sentiment".to_string(),
        alternates: to_strings(&["financial_phrasebank"]),
        label_candidates: to_strings(&["sentiment", "Sentiment", "label", "polarity"]),
        model: ModelKind::LogisticRegression,
    }
}

fn default_attrition() -> DomainConfig {
    DomainConfig {
        dataset: "customer_churn".to_string(),
        alternates: to_strings(&["bank_churn", "telco_churn"]),
        label_candidates: to_strings(&["Churn", "Exited", "Attrition", "churn", "Attrition_Flag"]),
        model: ModelKind::RandomForest,
    }
}

impl Default for DomainsConfig {
    fn default() -> Self {
        Self {
            fraud: default_fraud(),
            sentiment: default_sentiment(),
            attrition: default_attrition(),
        }
    }
}

impl DomainsConfig {
    pub fn get(&self, domain: Domain) -> &DomainConfig {
        match domain {
            Domain::Fraud => &self.fraud,
            Domain::Sentiment => &self.sentiment,
            Domain::Attrition => &self.attrition,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `FINCRIME__*` environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FINCRIME").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every evaluation fail
    pub fn validate(&self) -> Result<()> {
        let fraction = self.evaluation.test_fraction;
        ensure!(
            fraction > 0.0 && fraction < 1.0,
            "evaluation.test_fraction must be between 0 and 1, got {}",
            fraction
        );
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            cache: CacheConfig::default(),
            evaluation: EvaluationConfig::default(),
            domains: DomainsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
