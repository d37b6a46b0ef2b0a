//! Practice Report CLI
//!
//! Builds NON-PRODUCTION sample data, runs the analytics engine over it,
//! and prints a report.

use anyhow::Result;
use clap::Parser;
use practice_analytics::{AnalyticsEngine, ReportRequest};
use practice_fixtures::report::{emit, render};
use practice_fixtures::{Config, ReportFormat};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "practice-report")]
#[command(about = "Render a practice-group analytics report over sample data")]
struct Args {
    /// Primary metric key
    #[arg(short, long, default_value = "revenue")]
    metric: String,

    /// Periods to include (comma-separated); all when omitted
    #[arg(long, value_delimiter = ',')]
    periods: Option<Vec<String>>,

    /// Practice groups to include (comma-separated); all when omitted
    #[arg(long, value_delimiter = ',')]
    groups: Option<Vec<String>>,

    /// Years to include (comma-separated); no year filter when omitted
    #[arg(long, value_delimiter = ',')]
    years: Option<Vec<i32>>,

    /// Sample generator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Months of sample data
    #[arg(long)]
    months: Option<usize>,

    /// Years of sample data to generate (comma-separated)
    #[arg(long, value_delimiter = ',')]
    sample_years: Option<Vec<i32>>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<ReportFormat>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the metric registry and exit
    #[arg(long)]
    list_metrics: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(months) = args.months {
        config.months = months;
    }
    if let Some(years) = args.sample_years.clone() {
        config.years = years;
    }
    if let Some(format) = args.format {
        config.format = format;
    }

    // Logs go to stderr so the report can be piped.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if args.list_metrics {
        for info in AnalyticsEngine::metric_registry() {
            println!("{:<22} {:<24} {}", info.key, info.label, info.unit);
        }
        return Ok(());
    }

    let mut request = ReportRequest::new(&args.metric);
    if let Some(periods) = args.periods {
        request = request.with_periods(periods);
    }
    if let Some(groups) = args.groups {
        request = request.with_groups(groups);
    }
    if let Some(years) = args.years {
        request = request.with_years(years);
    }

    info!(
        seed = config.seed,
        months = config.months,
        years = ?config.years,
        "Generating sample report"
    );

    let report = render(&config, &request)?;
    emit(&report, args.output.as_deref())?;

    Ok(())
}
