//! Tabular dataset loading for model evaluation.
//!
//! A CSV is read with polars, the binary label column is resolved from a
//! candidate list and every remaining numeric column becomes a feature.
//! Rows are stored row-major so models can index samples directly.

use crate::error::EvaluationError;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::debug;

/// String label values that count as the positive class
const POSITIVE_LABELS: [&str; 8] = [
    "1", "yes", "true", "positive", "fraud", "churn", "churned", "attrited",
];

/// String label values that are neither positive nor negative
const NEUTRAL_LABELS: [&str; 2] = ["neutral", "mixed"];

/// Label class as read from the file, before binarising
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawLabel {
    Negative,
    Neutral,
    Positive,
}

/// How rows are dropped when a dataset exceeds the sample budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Seeded random subset, original order kept
    Random { seed: u64 },
    /// Evenly spaced rows, preserves temporal order
    Stride,
}

/// Numeric features plus a binary label per row
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Dataset identifier
    pub name: String,
    /// Feature column names, in row order
    pub feature_names: Vec<String>,
    /// Row-major feature values
    pub rows: Vec<Vec<f64>>,
    /// 1 = positive class
    pub labels: Vec<u8>,
    /// Name of the time column, if one was found
    pub time_column: Option<String>,
    /// Rows whose label was neutral; they train as the negative class
    pub neutral: Vec<bool>,
}

impl Dataset {
    /// Load a dataset from CSV
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        name: &str,
        label_candidates: &[String],
        time_candidates: &[String],
    ) -> Result<Self, EvaluationError> {
        let path = path.as_ref();
        debug!(dataset = %name, path = %path.display(), "Reading CSV");

        let df = CsvReader::from_path(path)?
            .has_header(true)
            .infer_schema(Some(10_000))
            .finish()?;

        Self::from_frame(name, &df, label_candidates, time_candidates)
    }

    /// Build a dataset from a polars frame
    pub fn from_frame(
        name: &str,
        df: &DataFrame,
        label_candidates: &[String],
        time_candidates: &[String],
    ) -> Result<Self, EvaluationError> {
        let column_names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let label_name = resolve_column(&column_names, label_candidates).ok_or_else(|| {
            EvaluationError::MissingLabel {
                dataset: name.to_string(),
                candidates: label_candidates.to_vec(),
            }
        })?;
        let raw_labels = label_values(df.column(&label_name)?)?;

        let mut columns = Vec::new();
        for series in df.get_columns() {
            if series.name() == label_name {
                continue;
            }
            let dtype = series.dtype();
            if !dtype.is_numeric() && dtype != &DataType::Boolean {
                debug!(dataset = %name, column = %series.name(), dtype = ?dtype, "Skipping non-numeric column");
                continue;
            }
            let casted = series.cast(&DataType::Float64)?;
            let values: Vec<f64> = casted
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
                .collect();
            columns.push((series.name().to_string(), values));
        }

        // rows with a null label carry no information
        let keep: Vec<usize> = raw_labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.map(|_| i))
            .collect();
        let classes: Vec<RawLabel> = keep.iter().filter_map(|&i| raw_labels[i]).collect();
        let labels: Vec<u8> = classes
            .iter()
            .map(|&c| u8::from(c == RawLabel::Positive))
            .collect();
        let neutral: Vec<bool> = classes.iter().map(|&c| c == RawLabel::Neutral).collect();
        let columns = columns
            .into_iter()
            .map(|(col, values)| (col, keep.iter().map(|&i| values[i]).collect()))
            .collect();

        let time_column = resolve_column(&column_names, time_candidates);
        let mut dataset = Self::from_columns(name, columns, labels, time_column.as_deref())?;
        dataset.neutral = neutral;
        Ok(dataset)
    }

    /// Build a dataset from named columns
    pub fn from_columns(
        name: &str,
        columns: Vec<(String, Vec<f64>)>,
        labels: Vec<u8>,
        time_column: Option<&str>,
    ) -> Result<Self, EvaluationError> {
        if labels.is_empty() {
            return Err(EvaluationError::EmptyDataset(name.to_string()));
        }
        if columns.is_empty() {
            return Err(EvaluationError::NoFeatures(name.to_string()));
        }
        if let Some((col, values)) = columns.iter().find(|(_, v)| v.len() != labels.len()) {
            return Err(EvaluationError::Model(format!(
                "column '{}' has {} values for {} labels",
                col,
                values.len(),
                labels.len()
            )));
        }

        let rows = (0..labels.len())
            .map(|i| columns.iter().map(|(_, values)| values[i]).collect())
            .collect();
        let feature_names: Vec<String> = columns.into_iter().map(|(col, _)| col).collect();
        let time_column = time_column
            .filter(|t| feature_names.iter().any(|f| f == t))
            .map(str::to_string);

        Ok(Self {
            name: name.to_string(),
            feature_names,
            rows,
            neutral: vec![false; labels.len()],
            labels,
            time_column,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of positive labels
    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1).count()
    }

    /// Rows labelled neutral (counted as negative for training)
    pub fn neutral_count(&self) -> usize {
        self.neutral.iter().filter(|&&n| n).count()
    }

    /// Both classes are present
    pub fn has_both_classes(&self) -> bool {
        let pos = self.positive_count();
        pos > 0 && pos < self.len()
    }

    /// Values of one feature column
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// Index of a feature by name
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|f| f == name)
    }

    /// Values of the time column, if present
    pub fn time_values(&self) -> Option<Vec<f64>> {
        let idx = self.feature_index(self.time_column.as_deref()?)?;
        Some(self.column(idx))
    }

    /// Indices of the features a model trains on: every column but the time column
    pub fn model_feature_indices(&self) -> Vec<usize> {
        let time_idx = self
            .time_column
            .as_deref()
            .and_then(|t| self.feature_index(t));
        (0..self.feature_count())
            .filter(|&i| Some(i) != time_idx)
            .collect()
    }

    /// Row-major model inputs with the time column removed
    pub fn model_rows(&self) -> Result<Vec<Vec<f64>>, EvaluationError> {
        let keep = self.model_feature_indices();
        if keep.is_empty() {
            return Err(EvaluationError::NoFeatures(self.name.clone()));
        }
        Ok(self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&i| row[i]).collect())
            .collect())
    }

    /// Rows at the given indices, in that order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            time_column: self.time_column.clone(),
            neutral: indices.iter().map(|&i| self.neutral[i]).collect(),
        }
    }

    /// Cap the dataset at `sample_size` rows, deterministically
    pub fn downsample(&self, sample_size: usize, mode: SamplingMode) -> Self {
        if sample_size == 0 || self.len() <= sample_size {
            return self.clone();
        }

        let indices = match mode {
            SamplingMode::Random { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut picked =
                    rand::seq::index::sample(&mut rng, self.len(), sample_size).into_vec();
                picked.sort_unstable();
                picked
            }
            SamplingMode::Stride => {
                let len = self.len();
                (0..sample_size).map(|k| k * len / sample_size).collect()
            }
        };

        debug!(
            dataset = %self.name,
            from = self.len(),
            to = indices.len(),
            mode = ?mode,
            "Downsampled dataset"
        );
        self.subset(&indices)
    }
}

/// First candidate matching a column exactly, then case-insensitively
pub fn resolve_column(columns: &[String], candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find_map(|c| columns.iter().find(|col| *col == c))
        .or_else(|| {
            candidates
                .iter()
                .find_map(|c| columns.iter().find(|col| col.eq_ignore_ascii_case(c)))
        })
        .cloned()
}

/// Whether a string label denotes the positive class
pub fn is_positive_label(value: &str) -> bool {
    let value = value.trim();
    POSITIVE_LABELS.iter().any(|p| value.eq_ignore_ascii_case(p))
}

/// Whether a string label denotes a neutral class
pub fn is_neutral_label(value: &str) -> bool {
    let value = value.trim();
    NEUTRAL_LABELS.iter().any(|n| value.eq_ignore_ascii_case(n))
}

fn classify_label(value: &str) -> RawLabel {
    if is_positive_label(value) {
        RawLabel::Positive
    } else if is_neutral_label(value) {
        RawLabel::Neutral
    } else {
        RawLabel::Negative
    }
}

fn binary_label(positive: bool) -> RawLabel {
    if positive {
        RawLabel::Positive
    } else {
        RawLabel::Negative
    }
}

fn label_values(series: &Series) -> Result<Vec<Option<RawLabel>>, EvaluationError> {
    let labels: Vec<Option<RawLabel>> = match series.dtype() {
        DataType::Utf8 => series
            .utf8()?
            .into_iter()
            .map(|v| v.map(classify_label))
            .collect(),
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(binary_label))
            .collect(),
        _ => {
            let casted = series.cast(&DataType::Float64)?;
            let values = casted.f64()?;
            values
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()).map(|x| binary_label(x != 0.0)))
                .collect()
        }
    };
    Ok(labels)
}
