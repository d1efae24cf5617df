//! Metrics record data structures

use crate::metrics::ClassificationScores;
use crate::split::SplitStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analytics domain a metrics record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Fraud,
    Sentiment,
    Attrition,
}

impl Domain {
    /// All domains in reporting order
    pub const ALL: [Domain; 3] = [Domain::Fraud, Domain::Sentiment, Domain::Attrition];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Fraud => "fraud",
            Domain::Sentiment => "sentiment",
            Domain::Attrition => "attrition",
        }
    }

    /// Key used for this domain in the consumer-facing metrics document
    pub fn report_key(&self) -> &'static str {
        match self {
            Domain::Fraud => "fraud_detection",
            Domain::Sentiment => "sentiment_analysis",
            Domain::Attrition => "customer_attrition",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fraud" | "fraud_detection" => Ok(Domain::Fraud),
            "sentiment" | "sentiment_analysis" => Ok(Domain::Sentiment),
            "attrition" | "churn" | "customer_attrition" => Ok(Domain::Attrition),
            other => Err(format!("unknown domain '{}'", other)),
        }
    }
}

/// Class shares of a sentiment dataset, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub negative: f64,
    #[serde(default)]
    pub neutral: f64,
}

/// Domain-specific rate carried by a record, flattened into its JSON form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainRate {
    Fraud { fraud_rate: f64 },
    Churn { churn_rate: f64 },
    Sentiment { sentiment_distribution: SentimentDistribution },
}

impl DomainRate {
    /// Compute the rate for a domain from binary labels (1 = positive class)
    pub fn from_labels(domain: Domain, labels: &[u8]) -> Self {
        let positives = labels.iter().filter(|&&y| y == 1).count();
        Self::from_label_counts(domain, positives, 0, labels.len())
    }

    /// Compute the rate from class counts; neutral rows only matter for sentiment
    pub fn from_label_counts(
        domain: Domain,
        positives: usize,
        neutrals: usize,
        total: usize,
    ) -> Self {
        let pct = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            }
        };
        let positive_pct = pct(positives);

        match domain {
            Domain::Fraud => DomainRate::Fraud {
                fraud_rate: positive_pct,
            },
            Domain::Attrition => DomainRate::Churn {
                churn_rate: positive_pct,
            },
            Domain::Sentiment => DomainRate::Sentiment {
                sentiment_distribution: SentimentDistribution {
                    positive: positive_pct,
                    negative: pct(total.saturating_sub(positives + neutrals)),
                    neutral: pct(neutrals),
                },
            },
        }
    }
}

/// Performance metrics for one model evaluated on one dataset
///
/// Immutable once created: a newer record supersedes it when its cache entry expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Source dataset identifier
    pub dataset_name: String,

    /// Rows used for the evaluation
    pub total_samples: usize,

    /// Fraud rate, churn rate or sentiment distribution (percent)
    #[serde(flatten)]
    pub rate: DomainRate,

    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,

    /// 0.5 when the test partition holds a single class
    pub auc_roc: f64,

    /// Algorithm label, e.g. "Random Forest"
    pub model_type: String,

    /// Partitioning strategy used, absent on fallback records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_strategy: Option<SplitStrategy>,

    /// True when the values are fixed estimates rather than a real evaluation
    #[serde(default)]
    pub fallback: bool,

    pub calculated_at: DateTime<Utc>,
}

impl MetricsRecord {
    /// Create a record from an evaluation
    pub fn new(
        dataset_name: impl Into<String>,
        total_samples: usize,
        rate: DomainRate,
        scores: ClassificationScores,
        model_type: impl Into<String>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            total_samples,
            rate,
            accuracy: scores.accuracy,
            precision: scores.precision,
            recall: scores.recall,
            f1_score: scores.f1_score,
            auc_roc: scores.auc_roc,
            model_type: model_type.into(),
            split_strategy: None,
            fallback: false,
            calculated_at: Utc::now(),
        }
    }

    /// Record the strategy that produced the partitions
    pub fn with_split_strategy(mut self, strategy: SplitStrategy) -> Self {
        self.split_strategy = Some(strategy);
        self
    }

    /// Whether the `model_type` label marks this as a degraded record
    pub fn is_estimate(&self) -> bool {
        self.fallback
            || self.model_type.contains("fallback")
            || self.model_type.contains("estimated")
    }
}

/// The document served to dashboard handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllPerformanceMetrics {
    pub fraud_detection: MetricsRecord,
    pub sentiment_analysis: MetricsRecord,
    pub customer_attrition: MetricsRecord,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scores() -> ClassificationScores {
        ClassificationScores {
            accuracy: 0.5,
            precision: 0.25,
            recall: 0.75,
            f1_score: 0.375,
            auc_roc: 0.625,
        }
    }

    #[test]
    fn test_rate_is_flattened_in_json() {
        let record = MetricsRecord::new(
            "creditcard",
            1000,
            DomainRate::Fraud { fraud_rate: 0.5 },
            sample_scores(),
            "Random Forest",
        )
        .with_split_strategy(SplitStrategy::TemporalSecure);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["fraud_rate"], 0.5);
        assert_eq!(value["split_strategy"], "temporal_secure");
        assert!(value.get("rate").is_none());

        let back: MetricsRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_sentiment_distribution_roundtrip() {
        let record = MetricsRecord::new(
            "reviews",
            10,
            DomainRate::from_labels(Domain::Sentiment, &[1, 1, 1, 0]),
            sample_scores(),
            "Logistic Regression",
        );

        let json = serde_json::to_string(&record).unwrap();
        let back: MetricsRecord = serde_json::from_str(&json).unwrap();

        match back.rate {
            DomainRate::Sentiment {
                sentiment_distribution,
            } => {
                assert_eq!(sentiment_distribution.positive, 75.0);
                assert_eq!(sentiment_distribution.negative, 25.0);
            }
            other => panic!("unexpected rate {:?}", other),
        }
    }

    #[test]
    fn test_rate_from_labels() {
        assert_eq!(
            DomainRate::from_labels(Domain::Attrition, &[1, 0, 0, 0]),
            DomainRate::Churn { churn_rate: 25.0 }
        );
        assert_eq!(
            DomainRate::from_labels(Domain::Fraud, &[]),
            DomainRate::Fraud { fraud_rate: 0.0 }
        );
    }

    #[test]
    fn test_neutral_share_kept_apart_from_negative() {
        let rate = DomainRate::from_label_counts(Domain::Sentiment, 5, 3, 10);
        assert_eq!(
            rate,
            DomainRate::Sentiment {
                sentiment_distribution: SentimentDistribution {
                    positive: 50.0,
                    negative: 20.0,
                    neutral: 30.0,
                },
            }
        );

        let json = serde_json::to_value(rate).unwrap();
        assert_eq!(json["sentiment_distribution"]["neutral"], 30.0);
    }

    #[test]
    fn test_domain_parsing() {
        assert_eq!("fraud".parse::<Domain>(), Ok(Domain::Fraud));
        assert_eq!("Churn".parse::<Domain>(), Ok(Domain::Attrition));
        assert_eq!(Domain::Sentiment.report_key(), "sentiment_analysis");
        assert!("weather".parse::<Domain>().is_err());
    }
}
