//! Fixed records served when a domain cannot be evaluated.

use crate::metrics::ClassificationScores;
use crate::types::{Domain, DomainRate, MetricsRecord, SentimentDistribution};

/// Constant estimate for a domain, marked as a fallback
///
/// Fraud records are labelled "(fallback)", the other domains "(estimated)".
pub fn fallback_record(domain: Domain, dataset_name: &str) -> MetricsRecord {
    let (total_samples, rate, scores, model_type) = match domain {
        Domain::Fraud => (
            284_807,
            DomainRate::Fraud { fraud_rate: 0.17 },
            ClassificationScores {
                accuracy: 0.9995,
                precision: 0.9412,
                recall: 0.8163,
                f1_score: 0.8743,
                auc_roc: 0.9731,
            },
            "Random Forest (fallback)",
        ),
        Domain::Sentiment => (
            4_846,
            DomainRate::Sentiment {
                sentiment_distribution: SentimentDistribution {
                    positive: 59.4,
                    negative: 40.6,
                    neutral: 0.0,
                },
            },
            ClassificationScores {
                accuracy: 0.8715,
                precision: 0.8832,
                recall: 0.9014,
                f1_score: 0.8922,
                auc_roc: 0.9378,
            },
            "Logistic Regression (estimated)",
        ),
        Domain::Attrition => (
            7_043,
            DomainRate::Churn { churn_rate: 26.54 },
            ClassificationScores {
                accuracy: 0.8005,
                precision: 0.6621,
                recall: 0.5134,
                f1_score: 0.5783,
                auc_roc: 0.8412,
            },
            "Random Forest (estimated)",
        ),
    };

    let mut record = MetricsRecord::new(dataset_name, total_samples, rate, scores, model_type);
    record.fallback = true;
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_records_are_marked() {
        for domain in Domain::ALL {
            let record = fallback_record(domain, "missing");
            assert!(record.fallback);
            assert!(record.is_estimate());
            assert!(
                record.model_type.contains("fallback") || record.model_type.contains("estimated")
            );
            assert_eq!(record.split_strategy, None);
        }
    }

    #[test]
    fn test_fraud_fallback_constants() {
        let record = fallback_record(Domain::Fraud, "creditcard");
        assert_eq!(record.dataset_name, "creditcard");
        assert_eq!(record.total_samples, 284_807);
        assert_eq!(record.rate, DomainRate::Fraud { fraud_rate: 0.17 });
        assert_eq!(record.accuracy, 0.9995);
        assert_eq!(record.auc_roc, 0.9731);
        assert_eq!(record.model_type, "Random Forest (fallback)");
    }

    #[test]
    fn test_domain_specific_rate() {
        assert!(matches!(
            fallback_record(Domain::Attrition, "churn").rate,
            DomainRate::Churn { .. }
        ));
        assert!(matches!(
            fallback_record(Domain::Sentiment, "reviews").rate,
            DomainRate::Sentiment { .. }
        ));
    }
}
