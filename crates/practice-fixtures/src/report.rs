//! Sample report rendering for the demo CLI.

use crate::config::{Config, ReportFormat};
use crate::sample::SampleGenerator;
use practice_analytics::{AnalyticsEngine, ReportRequest, Result};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Build the configured sample, run the engine, and render one report.
pub fn render(config: &Config, request: &ReportRequest) -> Result<String> {
    let source = SampleGenerator::new(config.seed)
        .with_months(config.months)
        .with_years(config.years.clone())
        .generate();
    let engine = AnalyticsEngine::load(&source)?;
    info!(
        records = engine.records().len(),
        metric = %request.metric,
        format = ?config.format,
        "Rendering sample report"
    );

    match config.format {
        ReportFormat::Markdown => engine.generate_report_markdown(request),
        ReportFormat::Json => engine.generate_report_json(request),
    }
}

/// Write a rendered report to `output`, or stdout when `None`.
pub fn emit(report: &str, output: Option<&Path>) -> io::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, report)?;
            info!(path = %path.display(), bytes = report.len(), "Report written");
            Ok(())
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(report.as_bytes())?;
            stdout.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown() {
        let config = Config {
            months: 2,
            ..Config::default()
        };
        let md = render(&config, &ReportRequest::new("revenue")).unwrap();
        assert!(md.starts_with("# Practice Group Analytics Report"));
        assert!(md.contains("February"));
    }

    #[test]
    fn test_render_json_multi_year() {
        let config = Config {
            months: 1,
            years: vec![2023, 2024],
            format: ReportFormat::Json,
            ..Config::default()
        };
        let json = render(&config, &ReportRequest::new("billable_hours")).unwrap();
        assert!(json.contains("\"year_over_year\""));
        assert!(json.contains("\"base_year\": 2023"));
    }

    #[test]
    fn test_render_unknown_metric() {
        let err = render(&Config::default(), &ReportRequest::new("profit")).unwrap_err();
        assert!(err.is_unknown_key());
    }

    #[test]
    fn test_emit_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        emit("# Report\n", Some(path.as_path())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Report\n");
    }
}
