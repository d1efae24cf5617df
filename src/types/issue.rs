//! Leakage validation report data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Points deducted from the validation score per critical issue
pub const CRITICAL_PENALTY: f64 = 2.0;
/// Points deducted from the validation score per warning
pub const WARNING_PENALTY: f64 = 0.5;
/// Score of a report with no issues
pub const MAX_SCORE: f64 = 10.0;

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Kind of leakage an issue points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakageKind {
    Temporal,
    Feature,
    Statistical,
    Pipeline,
}

/// One finding of the validation framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: LeakageKind,
    /// Feature the issue concerns, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    pub message: String,
    /// Measured value behind the finding (accuracy, correlation, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, kind: LeakageKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            feature: None,
            message: message.into(),
            value: None,
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

/// Severity-tagged findings plus a 0-10 score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub dataset_name: String,
    pub issues: Vec<ValidationIssue>,
    pub score: f64,
    pub validated_at: DateTime<Utc>,
}

impl ValidationReport {
    /// Build a report and score it
    pub fn new(dataset_name: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        let score = score_issues(&issues);
        Self {
            dataset_name: dataset_name.into(),
            issues,
            score,
            validated_at: Utc::now(),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// No critical findings
    pub fn passed(&self) -> bool {
        self.count(Severity::Critical) == 0
    }

    /// Issues of a given kind
    pub fn issues_of(&self, kind: LeakageKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

/// 10 minus 2 per critical issue and 0.5 per warning, floored at 0
pub fn score_issues(issues: &[ValidationIssue]) -> f64 {
    let penalty: f64 = issues
        .iter()
        .map(|issue| match issue.severity {
            Severity::Critical => CRITICAL_PENALTY,
            Severity::Warning => WARNING_PENALTY,
            Severity::Info => 0.0,
        })
        .sum();

    (MAX_SCORE - penalty).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity) -> ValidationIssue {
        ValidationIssue::new(severity, LeakageKind::Feature, "test")
    }

    #[test]
    fn test_score_deductions() {
        let issues = vec![
            issue(Severity::Critical),
            issue(Severity::Warning),
            issue(Severity::Info),
        ];
        assert_eq!(score_issues(&issues), 7.5);
        assert_eq!(score_issues(&[]), 10.0);
    }

    #[test]
    fn test_score_floor() {
        let issues: Vec<_> = (0..6).map(|_| issue(Severity::Critical)).collect();
        let report = ValidationReport::new("creditcard", issues);
        assert_eq!(report.score, 0.0);
        assert!(!report.passed());
        assert_eq!(report.count(Severity::Critical), 6);
    }

    #[test]
    fn test_issue_serialization() {
        let issue = issue(Severity::Critical).with_feature("V1").with_value(1.0);
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "CRITICAL");
        assert_eq!(json["kind"], "feature");
        assert_eq!(json["feature"], "V1");
    }
}
