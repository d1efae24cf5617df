//! Financial Crime Analytics - Main Entry Point
//!
//! Serves cached model performance metrics and runs leakage validation
//! against the configured datasets.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fincrime_analytics::{
    cache::MetricsCache, calculator::PerformanceCalculator, config::AppConfig,
    split::SplitStrategy, types::Domain, validation::LeakageThresholds,
    validation::ValidationFramework,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fincrime-analytics", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print metrics for every domain as JSON
    Metrics,
    /// Print metrics for one domain as JSON
    Domain {
        domain: Domain,
        /// Override the configured split strategy
        #[arg(long)]
        strategy: Option<SplitStrategy>,
    },
    /// Run leakage validation on a domain's dataset and print the report
    Validate {
        #[arg(long, default_value = "fraud")]
        domain: Domain,
        /// Dataset name; defaults to the domain's primary dataset
        #[arg(long)]
        dataset: Option<String>,
        /// Also audit the partition this strategy builds
        #[arg(long)]
        strategy: Option<SplitStrategy>,
    },
    /// Show cache size and expired keys
    Cache,
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load_from_path(path)
    } else {
        Ok(AppConfig::default())
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let directive = format!("fincrime_analytics={}", config.logging.level);
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_logging(&config)?;

    if !cli.config.exists() {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }
    info!(
        data_root = %config.data.root.display(),
        cache = %config.cache.path.display(),
        strategy = %config.evaluation.strategy,
        "Configuration loaded"
    );

    // One cache per process, shared by everything that reads metrics
    let cache = Arc::new(MetricsCache::load(&config.cache.path));
    let calculator = PerformanceCalculator::new(&config, cache.clone());

    match cli.command {
        Command::Metrics => print_json(&calculator.get_all_performance_metrics())?,
        Command::Domain { domain, strategy } => {
            let mut request = calculator.request_for(domain);
            if let Some(strategy) = strategy {
                request = request.with_strategy(strategy);
            }
            let outcome = calculator.outcome_for(request);
            if outcome.is_degraded() {
                warn!(domain = %domain, "Metrics are a fallback estimate");
            }
            print_json(outcome.record())?;
        }
        Command::Validate {
            domain,
            dataset,
            strategy,
        } => {
            let domain_config = config.domains.get(domain);
            let name = dataset.unwrap_or_else(|| domain_config.dataset.clone());
            let loaded = calculator
                .evaluator()
                .load_dataset(&name, &domain_config.label_candidates)?;

            let framework = ValidationFramework::new(
                LeakageThresholds::default(),
                config.evaluation.test_fraction,
                config.evaluation.seed,
            );
            let report = match strategy {
                Some(strategy) => {
                    let sampled = loaded.downsample(
                        config.evaluation.sample_size,
                        strategy.sampling_mode(config.evaluation.seed),
                    );
                    framework.validate_pipeline(&sampled, strategy)
                }
                None => framework.validate(&loaded),
            };
            print_json(&report)?;
        }
        Command::Cache => {
            let stale = cache.stale_keys();
            info!(entries = cache.len(), stale = stale.len(), "Metrics cache");
            print_json(&serde_json::json!({
                "path": cache.path(),
                "entries": cache.len(),
                "stale_keys": stale,
            }))?;
        }
    }

    Ok(())
}
