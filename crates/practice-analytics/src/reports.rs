//! Report generation for analytics data.

use crate::engine::{AnalyticsEngine, ReportRequest};
use crate::error::Result;
use crate::queries::{Aggregation, Selection};
use crate::views::{BreakdownTable, KpiCard, MetricsTable, PivotView, TimeSeries, YoyTable};
use practice_domain::{Dimension, Metric, MetricInfo};
use serde::Serialize;

/// Comprehensive analytics report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub generated_at: String,
    pub metric: MetricInfo,
    pub selection: Selection,
    pub kpis: Vec<KpiCard>,
    pub time_series: TimeSeries,
    pub group_breakdown: BreakdownTable,
    pub metrics_table: MetricsTable,
    pub heatmap: PivotView,
    pub year_over_year: Option<YoyTable>,
}

impl AnalyticsEngine {
    /// Generate comprehensive analytics report.
    ///
    /// Year-over-year growth is included when the selection spans at least
    /// two years; it compares the latest year with the one before it.
    pub fn generate_report(&self, request: &ReportRequest) -> Result<AnalyticsReport> {
        let metric = Metric::from_key(&request.metric)?;
        let selection = self.selection(request);

        let kpis = self.kpis(request)?;
        let time_series = self.time_series(request)?;
        let group_breakdown = self.breakdown(request, Dimension::Group)?;
        let metrics_table = self.metrics_table(request)?;
        let heatmap = self.pivot_table(request, Dimension::Group, Dimension::Period, Aggregation::Sum)?;

        let years = self.selected(request)?.years();
        let year_over_year = match years.as_slice() {
            [.., base, compare] => Some(self.yoy_table(request, *base, *compare)?),
            _ => None,
        };

        Ok(AnalyticsReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            metric: metric.info(),
            selection,
            kpis,
            time_series,
            group_breakdown,
            metrics_table,
            heatmap,
            year_over_year,
        })
    }

    /// Generate report as JSON string.
    pub fn generate_report_json(&self, request: &ReportRequest) -> Result<String> {
        let report = self.generate_report(request)?;
        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// Generate Markdown report.
    pub fn generate_report_markdown(&self, request: &ReportRequest) -> Result<String> {
        let report = self.generate_report(request)?;

        let mut md = String::new();
        md.push_str("# Practice Group Analytics Report\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", report.generated_at));
        md.push_str(&format!("**Primary metric:** {}\n\n", report.metric.label));

        md.push_str("## Key Performance Indicators\n\n");
        md.push_str("| Indicator | Value | Comparison |\n");
        md.push_str("|-----------|-------|------------|\n");
        for card in &report.kpis {
            md.push_str(&format!(
                "| {} | {} | {} {} |\n",
                card.label, card.value, card.delta, card.delta_label
            ));
        }
        md.push('\n');

        if !report.time_series.points.is_empty() {
            md.push_str(&format!("## {} Over Time\n\n", report.metric.label));
            md.push_str("| Period | Group | Value |\n");
            md.push_str("|--------|-------|-------|\n");
            for point in &report.time_series.points {
                let period = match point.year {
                    Some(year) => format!("{} {year}", point.period),
                    None => point.period.clone(),
                };
                md.push_str(&format!("| {} | {} | {} |\n", period, point.group, point.value));
            }
            md.push('\n');
        }

        if !report.group_breakdown.rows.is_empty() {
            md.push_str("## Practice Group Distribution\n\n");
            md.push_str("| Group | Total | Mean | Share |\n");
            md.push_str("|-------|-------|------|-------|\n");
            for row in &report.group_breakdown.rows {
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    row.key, row.sum, row.mean, row.share_pct
                ));
            }
            md.push('\n');
        }

        if !report.heatmap.rows.is_empty() {
            md.push_str("## Performance Heatmap\n\n");
            md.push_str(&format!("| Group | {} |\n", report.heatmap.columns.join(" | ")));
            md.push_str(&format!(
                "|-------|{}\n",
                "------|".repeat(report.heatmap.columns.len())
            ));
            for row in &report.heatmap.rows {
                let cells: Vec<String> = row.cells.iter().map(ToString::to_string).collect();
                md.push_str(&format!("| {} | {} |\n", row.key, cells.join(" | ")));
            }
            md.push('\n');
        }

        if !report.metrics_table.rows.is_empty() {
            md.push_str("## Detailed Metrics\n\n");
            let headers: Vec<&str> = report
                .metrics_table
                .columns
                .iter()
                .map(|c| c.metric.label)
                .collect();
            md.push_str(&format!("| Group | {} |\n", headers.join(" | ")));
            md.push_str(&format!("|-------|{}\n", "------|".repeat(headers.len())));
            for row in &report.metrics_table.rows {
                let values: Vec<String> = row.values.iter().map(ToString::to_string).collect();
                md.push_str(&format!("| {} | {} |\n", row.group, values.join(" | ")));
            }
            md.push('\n');
        }

        if let Some(ref yoy) = report.year_over_year {
            md.push_str(&format!(
                "## Year over Year ({} vs {})\n\n",
                yoy.compare_year, yoy.base_year
            ));
            md.push_str(&format!(
                "| Period | {} | {} | Growth |\n",
                yoy.base_year, yoy.compare_year
            ));
            md.push_str("|--------|------|------|--------|\n");
            for row in &yoy.rows {
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    row.period, row.base, row.compare, row.growth_pct
                ));
            }
            md.push('\n');
        }

        md.push_str("---\n");
        md.push_str("*Rates are simple means of per-record rates.*\n");

        Ok(md)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RawSource;
    use practice_domain::RawMetrics;

    fn single_year() -> AnalyticsEngine {
        let source = RawSource::new().with_period(
            "January",
            None,
            [
                ("Litigation", RawMetrics::new(604.00, 0.0, 594.00, 357_942.29)),
                ("Intellectual Property", RawMetrics::new(0.0, 0.0, 0.0, 0.0)),
            ],
        );
        AnalyticsEngine::load(&source).unwrap()
    }

    #[test]
    fn test_empty_report() {
        let engine = AnalyticsEngine::load(&RawSource::new()).unwrap();
        let report = engine.generate_report(&ReportRequest::new("revenue")).unwrap();
        assert!(report.time_series.points.is_empty());
        assert!(report.group_breakdown.rows.is_empty());
        assert!(report.year_over_year.is_none());
        assert!(report.kpis[0].value.is_no_data());
    }

    #[test]
    fn test_markdown_generation() {
        let md = single_year()
            .generate_report_markdown(&ReportRequest::new("revenue"))
            .unwrap();
        assert!(md.contains("# Practice Group Analytics Report"));
        assert!(md.contains("$357,942.29"));
        assert!(md.contains("Performance Heatmap"));
        // Undefined rates render as no data, never as zero.
        assert!(md.contains(practice_domain::NO_DATA));
        assert!(!md.contains("Year over Year"));
    }

    #[test]
    fn test_report_includes_yoy_for_multi_year() {
        let source = RawSource::new()
            .with_period("January", Some(2023), [("Litigation", RawMetrics::new(10.0, 0.0, 10.0, 100_000.0))])
            .with_period("January", Some(2024), [("Litigation", RawMetrics::new(12.0, 0.0, 12.0, 120_000.0))]);
        let engine = AnalyticsEngine::load(&source).unwrap();
        let report = engine.generate_report(&ReportRequest::new("revenue")).unwrap();
        let yoy = report.year_over_year.unwrap();
        assert_eq!((yoy.base_year, yoy.compare_year), (2023, 2024));
        assert_eq!(yoy.rows[0].growth_pct.formatted(), "20.0%");
    }

    #[test]
    fn test_json_generation() {
        let json = single_year()
            .generate_report_json(&ReportRequest::new("utilization_rate"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metric"]["key"], "utilization_rate");
        assert_eq!(value["metric"]["unit"], "percent");
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_report_rejects_unknown_metric() {
        let err = single_year()
            .generate_report(&ReportRequest::new("margin"))
            .unwrap_err();
        assert!(err.is_unknown_key());
    }
}
