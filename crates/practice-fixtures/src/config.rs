//! # Report Configuration
//!
//! Environment-based configuration for the sample report CLI.

use std::env;
use std::str::FromStr;

/// Output format of the rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format '{other}'")),
        }
    }
}

/// Sample report configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Logging level
    pub log_level: String,

    /// Seed for the sample generator
    pub seed: u64,

    /// Months of sample data, from January
    pub months: usize,

    /// Calendar years to generate; empty for a single untracked year
    pub years: Vec<i32>,

    /// Output format
    pub format: ReportFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            seed: lookup("SAMPLE_SEED")
                .and_then(|v| v.parse().ok())
                .unwrap_or(42),

            months: lookup("SAMPLE_MONTHS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),

            years: lookup("SAMPLE_YEARS")
                .map(|v| {
                    v.split(',')
                        .filter_map(|y| y.trim().parse().ok())
                        .collect()
                })
                .unwrap_or_default(),

            format: lookup("REPORT_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(ReportFormat::Markdown),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
