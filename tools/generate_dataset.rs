//! Synthetic Dataset Generator
//!
//! Writes a labelled CSV for one domain into the data directory layout the
//! evaluator searches, so the metrics and validation commands can run
//! without downloading real datasets.

use anyhow::{bail, Context};
use fincrime_analytics::types::Domain;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::info;

/// Columns of a synthetic dataset, filled one row at a time
struct DatasetGenerator {
    domain: Domain,
    rng: StdRng,
    clock: f64,
    numeric: Vec<(&'static str, Vec<f64>)>,
    labels: Vec<&'static str>,
    times: Vec<f64>,
}

impl DatasetGenerator {
    fn new(domain: Domain, seed: u64) -> Self {
        let names: &[&'static str] = match domain {
            Domain::Fraud => &["V1", "V2", "V3", "V4", "Amount"],
            Domain::Sentiment => &[
                "word_count",
                "positive_terms",
                "negative_terms",
                "exclamations",
            ],
            Domain::Attrition => &[
                "tenure",
                "monthly_charges",
                "total_charges",
                "support_calls",
            ],
        };
        Self {
            domain,
            rng: StdRng::seed_from_u64(seed),
            clock: 0.0,
            numeric: names.iter().map(|&n| (n, Vec::new())).collect(),
            labels: Vec::new(),
            times: Vec::new(),
        }
    }

    /// Label column name and its (negative, positive) values
    fn label_column(&self) -> (&'static str, [&'static str; 2]) {
        match self.domain {
            Domain::Fraud => ("Class", ["0", "1"]),
            Domain::Sentiment => ("sentiment", ["negative", "positive"]),
            Domain::Attrition => ("Churn", ["No", "Yes"]),
        }
    }

    /// Dataset name the evaluator looks for by default
    fn dataset_name(&self) -> &'static str {
        match self.domain {
            Domain::Fraud => "creditcard",
            Domain::Sentiment => "financial_sentiment",
            Domain::Attrition => "customer_churn",
        }
    }

    fn push_row(&mut self, positive: bool) {
        // strictly increasing, irregular gaps
        self.clock += self.rng.gen_range(1.0..120.0);
        self.times.push(self.clock.round());

        let values = match self.domain {
            Domain::Fraud => self.fraud_row(positive),
            Domain::Sentiment => self.sentiment_row(positive),
            Domain::Attrition => self.attrition_row(positive),
        };
        for ((_, column), value) in self.numeric.iter_mut().zip(values) {
            column.push(value);
        }

        let (_, values) = self.label_column();
        self.labels.push(values[usize::from(positive)]);
    }

    fn fraud_row(&mut self, positive: bool) -> Vec<f64> {
        let shift = if positive { 2.5 } else { 0.0 };
        let amount = if positive {
            self.rng.gen_range(500.0..5000.0)
        } else {
            self.rng.gen_range(1.0..400.0)
        };
        vec![
            self.rng.gen_range(-2.0..2.0) - shift,
            self.rng.gen_range(-2.0..2.0) + shift,
            self.rng.gen_range(-2.0..2.0),
            self.rng.gen_range(-2.0..2.0) + shift / 2.0,
            (amount * 100.0_f64).round() / 100.0,
        ]
    }

    fn sentiment_row(&mut self, positive: bool) -> Vec<f64> {
        let words: u32 = self.rng.gen_range(8..60);
        let (pos, neg): (u32, u32) = if positive {
            (self.rng.gen_range(1..6), self.rng.gen_range(0..2))
        } else {
            (self.rng.gen_range(0..2), self.rng.gen_range(1..6))
        };
        let exclamations: u32 = self.rng.gen_range(0..3);
        vec![
            f64::from(words),
            f64::from(pos),
            f64::from(neg),
            f64::from(exclamations),
        ]
    }

    fn attrition_row(&mut self, positive: bool) -> Vec<f64> {
        let tenure: f64 = if positive {
            self.rng.gen_range(0.0_f64..18.0)
        } else {
            self.rng.gen_range(6.0..72.0)
        }
        .round();
        let monthly = if positive {
            self.rng.gen_range(60.0..120.0)
        } else {
            self.rng.gen_range(20.0..90.0)
        };
        let calls = f64::from(if positive {
            self.rng.gen_range(2_u32..8)
        } else {
            self.rng.gen_range(0_u32..3)
        });
        vec![
            tenure,
            (monthly * 100.0_f64).round() / 100.0,
            (tenure * monthly).round(),
            calls,
        ]
    }

    fn into_frame(self) -> PolarsResult<DataFrame> {
        let (label_name, _) = self.label_column();
        let mut columns = vec![Series::new("Time", self.times)];
        columns.extend(
            self.numeric
                .into_iter()
                .map(|(name, values)| Series::new(name, values)),
        );
        columns.push(Series::new(label_name, self.labels));
        DataFrame::new(columns)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_dataset=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let domain: Domain = match args.get(1) {
        Some(d) => d.parse().map_err(anyhow::Error::msg)?,
        None => bail!("usage: generate_dataset <domain> <rows> <positive_rate> [data_root]"),
    };
    let rows: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5000);
    let positive_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let data_root = PathBuf::from(args.get(4).map(|s| s.as_str()).unwrap_or("data"));
    let seed: u64 = std::env::var("GENERATE_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);

    if !(0.0..=1.0).contains(&positive_rate) {
        bail!("positive_rate must be between 0 and 1, got {}", positive_rate);
    }

    let mut generator = DatasetGenerator::new(domain, seed);
    let name = generator.dataset_name();
    info!(
        domain = %domain,
        dataset = name,
        rows = rows,
        positive_rate = positive_rate,
        "Generating dataset"
    );

    let mut label_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut positives = 0;
    for _ in 0..rows {
        let positive = label_rng.gen_bool(positive_rate);
        positives += usize::from(positive);
        generator.push_row(positive);
    }

    let mut df = generator.into_frame()?;

    let dir = data_root.join(name);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("{}_processed.csv", name));
    let mut file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;

    info!(
        path = %path.display(),
        rows = rows,
        positives = positives,
        "Dataset written"
    );

    Ok(())
}
