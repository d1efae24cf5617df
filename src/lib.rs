//! Financial Crime Analytics Library
//!
//! Computes performance metrics for fraud, sentiment and attrition models
//! from CSV datasets, caches them in a JSON file with a one hour TTL, and
//! audits datasets and evaluation pipelines for data leakage.

pub mod cache;
pub mod calculator;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod fallback;
pub mod metrics;
pub mod models;
pub mod split;
pub mod types;
pub mod validation;

pub use cache::MetricsCache;
pub use calculator::{MetricsOutcome, PerformanceCalculator};
pub use config::AppConfig;
pub use dataset::Dataset;
pub use error::{CacheError, EvaluationError};
pub use evaluator::{EvaluationRequest, PerformanceEvaluator};
pub use split::SplitStrategy;
pub use types::{AllPerformanceMetrics, Domain, MetricsRecord, ValidationReport};
pub use validation::ValidationFramework;
