//! Type definitions shared by the evaluator, cache and validation framework

pub mod issue;
pub mod record;

pub use issue::{LeakageKind, Severity, ValidationIssue, ValidationReport};
pub use record::{AllPerformanceMetrics, Domain, DomainRate, MetricsRecord, SentimentDistribution};
