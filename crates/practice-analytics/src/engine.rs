//! Reporting facade over a derived record set.

use crate::derive::derive;
use crate::error::Result;
use crate::queries::{self, Aggregation, Selection, Summary};
use crate::store::{RawSource, RecordSet, RecordStore};
use crate::views::{
    BreakdownRow, BreakdownTable, DisplayValue, KpiCard, MetricsColumn, MetricsRow, MetricsTable,
    PivotView, PivotViewRow, ScatterPlot, ScatterPoint, TimePoint, TimeSeries, YoyTable,
    YoyViewRow,
};
use practice_domain::{Dimension, Metric, MetricInfo, Unit, metric_registry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// A reporting query from the presentation layer.
///
/// `None` for periods or groups means "all of them". An explicit empty set
/// selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub periods: Option<BTreeSet<String>>,
    pub groups: Option<BTreeSet<String>>,
    pub years: Option<BTreeSet<i32>>,
    pub metric: String,
}

impl ReportRequest {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_periods<I>(mut self, periods: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.periods = Some(periods.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_years<I: IntoIterator<Item = i32>>(mut self, years: I) -> Self {
        self.years = Some(years.into_iter().collect());
        self
    }
}

/// Columns of the detailed metrics table: totals for volumes, means for rates.
const METRICS_TABLE_COLUMNS: [(Metric, Aggregation); 5] = [
    (Metric::BillableHours, Aggregation::Sum),
    (Metric::Revenue, Aggregation::Sum),
    (Metric::UtilizationRate, Aggregation::Mean),
    (Metric::RealizationRate, Aggregation::Mean),
    (Metric::AverageHourlyRate, Aggregation::Mean),
];

/// Stateless reporting facade.
///
/// Holds one derived, read-only record set. Every call takes its own
/// request, so one engine can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    records: RecordSet,
}

impl AnalyticsEngine {
    /// Wrap a loaded record set, deriving metrics for every record.
    pub fn new(records: &RecordSet) -> Self {
        Self {
            records: derive(records),
        }
    }

    /// Load with the default calendar and practice groups.
    pub fn load(source: &RawSource) -> Result<Self> {
        Self::load_with(&RecordStore::default(), source)
    }

    pub fn load_with(store: &RecordStore, source: &RawSource) -> Result<Self> {
        let records = store.load(source)?;
        Ok(Self::new(&records))
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// Metric key to label and unit. Formats must come from here.
    pub fn metric_registry() -> Vec<MetricInfo> {
        metric_registry()
    }

    pub fn metric_info(key: &str) -> Result<MetricInfo> {
        Ok(Metric::from_key(key)?.info())
    }

    /// Expand the request's "all" defaults into a strict selection.
    pub fn selection(&self, request: &ReportRequest) -> Selection {
        let everything = Selection::everything(&self.records);
        Selection {
            periods: request.periods.clone().unwrap_or(everything.periods),
            groups: request.groups.clone().unwrap_or(everything.groups),
            years: request.years.clone(),
        }
    }

    /// Records matching the request.
    pub fn selected(&self, request: &ReportRequest) -> Result<RecordSet> {
        queries::select(&self.records, &self.selection(request))
    }

    fn resolve(&self, request: &ReportRequest) -> Result<(RecordSet, Metric)> {
        let metric = Metric::from_key(&request.metric)?;
        let selected = self.selected(request)?;
        debug!(%metric, records = selected.len(), "Request resolved");
        Ok((selected, metric))
    }

    /// One point per selected record, ordered by period, year, then group.
    pub fn time_series(&self, request: &ReportRequest) -> Result<TimeSeries> {
        let (selected, metric) = self.resolve(request)?;

        let mut group_order: HashMap<&str, usize> = HashMap::new();
        for record in &selected {
            let next = group_order.len();
            group_order.entry(record.group.as_str()).or_insert(next);
        }

        let mut ordered: Vec<_> = selected.iter().collect();
        ordered.sort_by_key(|r| (selected.rank_of(r), r.year, group_order[r.group.as_str()]));

        let unit = metric.unit();
        let points = ordered
            .into_iter()
            .map(|r| TimePoint {
                period: r.period.clone(),
                year: r.year,
                group: r.group.clone(),
                value: DisplayValue::new(r.metric(metric), unit),
            })
            .collect();

        Ok(TimeSeries {
            metric: metric.info(),
            points,
        })
    }

    /// Metric summarized by `dimension`, with each row's share of the total.
    pub fn breakdown(&self, request: &ReportRequest, dimension: Dimension) -> Result<BreakdownTable> {
        let (selected, metric) = self.resolve(request)?;
        let unit = metric.unit();
        let total = queries::summarize(&selected, metric).sum;

        let rows = queries::aggregate(&selected, metric, dimension)?
            .into_iter()
            .map(|row| {
                let share = match (row.summary.sum, total) {
                    (Some(part), Some(total)) if total != 0.0 => Some(part / total * 100.0),
                    _ => None,
                };
                BreakdownRow {
                    key: row.key,
                    count: row.summary.count,
                    sum: DisplayValue::new(row.summary.sum, unit),
                    mean: DisplayValue::new(row.summary.mean, unit),
                    share_pct: DisplayValue::new(share, Unit::Percent),
                }
            })
            .collect();

        Ok(BreakdownTable {
            metric: metric.info(),
            dimension,
            rows,
            total: DisplayValue::new(total, unit),
        })
    }

    /// Per-group totals of hours and revenue alongside mean rates.
    ///
    /// Rate columns are simple means of the per-record rates, not
    /// hours-weighted ratios.
    pub fn metrics_table(&self, request: &ReportRequest) -> Result<MetricsTable> {
        Metric::from_key(&request.metric)?;
        let selected = self.selected(request)?;

        let per_metric = METRICS_TABLE_COLUMNS
            .iter()
            .map(|(metric, _)| queries::aggregate(&selected, *metric, Dimension::Group))
            .collect::<Result<Vec<_>>>()?;

        let groups: Vec<String> = per_metric
            .first()
            .map(|rows| rows.iter().map(|r| r.key.clone()).collect())
            .unwrap_or_default();

        let rows = groups
            .into_iter()
            .enumerate()
            .map(|(i, group)| {
                let values = METRICS_TABLE_COLUMNS
                    .iter()
                    .zip(&per_metric)
                    .map(|((metric, aggregation), rows)| {
                        DisplayValue::new(rows[i].summary.get(*aggregation), metric.unit())
                    })
                    .collect();
                MetricsRow { group, values }
            })
            .collect();

        Ok(MetricsTable {
            columns: METRICS_TABLE_COLUMNS
                .iter()
                .map(|(metric, aggregation)| MetricsColumn {
                    metric: metric.info(),
                    aggregation: *aggregation,
                })
                .collect(),
            rows,
        })
    }

    /// Cross-tab of the requested metric.
    pub fn pivot_table(
        &self,
        request: &ReportRequest,
        row_dimension: Dimension,
        column_dimension: Dimension,
        aggregation: Aggregation,
    ) -> Result<PivotView> {
        let (selected, metric) = self.resolve(request)?;
        let table = queries::pivot(&selected, metric, row_dimension, column_dimension, aggregation)?;
        let unit = match aggregation {
            Aggregation::Count => Unit::Count,
            _ => metric.unit(),
        };

        let rows = table
            .rows
            .iter()
            .zip(&table.cells)
            .map(|(key, cells)| PivotViewRow {
                key: key.clone(),
                cells: cells.iter().map(|v| DisplayValue::new(*v, unit)).collect(),
            })
            .collect();

        Ok(PivotView {
            metric: metric.info(),
            aggregation,
            row_dimension,
            column_dimension,
            columns: table.columns,
            rows,
        })
    }

    /// Growth of the requested metric between two years, per period.
    pub fn yoy_table(
        &self,
        request: &ReportRequest,
        base_year: i32,
        compare_year: i32,
    ) -> Result<YoyTable> {
        let (selected, metric) = self.resolve(request)?;
        let unit = metric.unit();
        let rows = queries::yoy(&selected, metric, base_year, compare_year)?
            .into_iter()
            .map(|row| YoyViewRow {
                period: row.period,
                base: DisplayValue::new(row.base, unit),
                compare: DisplayValue::new(row.compare, unit),
                growth_pct: DisplayValue::new(row.growth_pct, Unit::Percent),
            })
            .collect();

        Ok(YoyTable {
            metric: metric.info(),
            base_year,
            compare_year,
            rows,
        })
    }

    /// Headline indicators for the selection.
    ///
    /// Revenue is compared per selected period; mean rates are compared
    /// with the same mean over the whole record set.
    #[allow(clippy::cast_precision_loss)]
    pub fn kpis(&self, request: &ReportRequest) -> Result<Vec<KpiCard>> {
        Metric::from_key(&request.metric)?;
        let selected = self.selected(request)?;

        let period_count = request
            .periods
            .as_ref()
            .map_or_else(|| self.records.periods().len(), BTreeSet::len);
        let total_revenue = queries::summarize(&selected, Metric::Revenue).sum;
        let per_period = total_revenue.filter(|_| period_count > 0).map(|t| t / period_count as f64);

        let mut cards = vec![KpiCard {
            key: "total_revenue",
            label: "Total Revenue",
            value: DisplayValue::new(total_revenue, Unit::Currency),
            delta: DisplayValue::new(per_period, Unit::Currency),
            delta_label: "per period",
        }];

        for (key, label, metric) in [
            ("average_utilization", "Average Utilization Rate", Metric::UtilizationRate),
            ("average_realization", "Average Realization Rate", Metric::RealizationRate),
            ("average_hourly_rate", "Average Hourly Rate", Metric::AverageHourlyRate),
        ] {
            let current = queries::summarize(&selected, metric).mean;
            let baseline = queries::summarize(&self.records, metric).mean;
            let delta = current.zip(baseline).map(|(c, b)| c - b);
            cards.push(KpiCard {
                key,
                label,
                value: DisplayValue::new(current, metric.unit()),
                delta: DisplayValue::new(delta, metric.unit()),
                delta_label: "vs all time",
            });
        }

        Ok(cards)
    }

    /// Points relating two metrics, sized by a third.
    pub fn scatter(
        &self,
        request: &ReportRequest,
        x_metric: &str,
        y_metric: &str,
        size_metric: &str,
    ) -> Result<ScatterPlot> {
        let x = Metric::from_key(x_metric)?;
        let y = Metric::from_key(y_metric)?;
        let size = Metric::from_key(size_metric)?;
        let selected = self.selected(request)?;

        let points = selected
            .iter()
            .map(|r| ScatterPoint {
                period: r.period.clone(),
                year: r.year,
                group: r.group.clone(),
                x: r.metric(x),
                y: r.metric(y),
                size: r.metric(size),
            })
            .collect();

        Ok(ScatterPlot {
            x: x.info(),
            y: y.info(),
            size: size.info(),
            points,
        })
    }

    /// Summary of the requested metric over the whole selection.
    pub fn summary(&self, request: &ReportRequest) -> Result<Summary> {
        let (selected, metric) = self.resolve(request)?;
        Ok(queries::summarize(&selected, metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_domain::RawMetrics;

    const EPS: f64 = 1e-9;

    fn engine() -> AnalyticsEngine {
        let source = RawSource::new()
            .with_period(
                "February",
                None,
                [
                    ("Litigation", RawMetrics::new(100.0, 0.0, 100.0, 60_000.0)),
                    ("Corporate & Securities", RawMetrics::new(200.0, 50.0, 180.0, 150_000.0)),
                ],
            )
            .with_period(
                "January",
                None,
                [
                    ("Corporate & Securities", RawMetrics::new(0.0, 20.0, 0.0, 0.0)),
                    ("Litigation", RawMetrics::new(300.0, 100.0, 240.0, 90_000.0)),
                ],
            );
        AnalyticsEngine::load(&source).unwrap()
    }

    #[test]
    fn test_fixed_layout_reports_reject_unknown_metric() {
        let engine = engine();
        let request = ReportRequest::new("profit");
        assert!(engine.kpis(&request).unwrap_err().is_unknown_key());
        assert!(engine.metrics_table(&request).unwrap_err().is_unknown_key());
    }

    #[test]
    fn test_engine_derives_on_construction() {
        assert!(engine().records().is_derived());
    }

    #[test]
    fn test_request_defaults_to_everything() {
        let engine = engine();
        let selected = engine.selected(&ReportRequest::new("revenue")).unwrap();
        assert_eq!(selected.len(), 4);

        let none = engine
            .selected(&ReportRequest::new("revenue").with_groups(Vec::<String>::new()))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_unknown_metric_fails_fast() {
        let err = engine().time_series(&ReportRequest::new("profit")).unwrap_err();
        assert!(err.is_unknown_key());
        assert!(AnalyticsEngine::metric_info("profit").is_err());
        assert_eq!(
            AnalyticsEngine::metric_info("revenue").unwrap().unit,
            Unit::Currency
        );
    }

    #[test]
    fn test_time_series_calendar_order() {
        let series = engine().time_series(&ReportRequest::new("revenue")).unwrap();
        let order: Vec<(&str, &str)> = series
            .points
            .iter()
            .map(|p| (p.period.as_str(), p.group.as_str()))
            .collect();
        // Groups keep first-seen order: Litigation was seen before Corporate.
        assert_eq!(
            order,
            vec![
                ("January", "Litigation"),
                ("January", "Corporate & Securities"),
                ("February", "Litigation"),
                ("February", "Corporate & Securities"),
            ]
        );
        assert_eq!(series.metric.unit, Unit::Currency);
    }

    #[test]
    fn test_breakdown_shares() {
        let table = engine()
            .breakdown(&ReportRequest::new("revenue"), Dimension::Group)
            .unwrap();
        assert_eq!(table.total.value, Some(300_000.0));
        let litigation = &table.rows[0];
        assert_eq!(litigation.key, "Litigation");
        assert!((litigation.share_pct.value.unwrap() - 50.0).abs() < EPS);
        assert_eq!(litigation.share_pct.unit, Unit::Percent);
    }

    #[test]
    fn test_breakdown_of_empty_selection_is_no_data() {
        let table = engine()
            .breakdown(
                &ReportRequest::new("utilization_rate").with_periods(Vec::<String>::new()),
                Dimension::Group,
            )
            .unwrap();
        assert!(table.rows.is_empty());
        assert!(table.total.is_no_data());
    }

    #[test]
    fn test_metrics_table() {
        let table = engine().metrics_table(&ReportRequest::new("revenue")).unwrap();
        assert_eq!(table.columns.len(), 5);
        assert_eq!(table.rows[0].group, "Litigation");

        let corporate = &table.rows[1];
        assert_eq!(corporate.values[0].value, Some(200.0));
        assert_eq!(corporate.values[1].value, Some(150_000.0));
        // January has no billable hours, so only February's rate counts.
        assert_eq!(corporate.values[3].value, Some(90.0));
        assert_eq!(corporate.values[3].unit, Unit::Percent);
    }

    #[test]
    fn test_pivot_view_count_unit() {
        let view = engine()
            .pivot_table(
                &ReportRequest::new("realization_rate"),
                Dimension::Group,
                Dimension::Period,
                Aggregation::Count,
            )
            .unwrap();
        assert_eq!(view.columns, vec!["January", "February"]);
        assert_eq!(view.rows[1].cells[0].value, Some(0.0));
        assert_eq!(view.rows[1].cells[0].unit, Unit::Count);
    }

    #[test]
    fn test_kpis() {
        let engine = engine();
        let cards = engine.kpis(&ReportRequest::new("revenue")).unwrap();
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].value.value, Some(300_000.0));
        assert_eq!(cards[0].delta.value, Some(150_000.0));
        // Unfiltered selection compares against itself.
        assert_eq!(cards[1].delta.value, Some(0.0));

        let january = engine
            .kpis(&ReportRequest::new("revenue").with_periods(["January"]))
            .unwrap();
        assert_eq!(january[0].value.value, Some(90_000.0));
        assert_eq!(january[0].delta.value, Some(90_000.0));

        let nothing = engine
            .kpis(&ReportRequest::new("revenue").with_periods(Vec::<String>::new()))
            .unwrap();
        assert!(nothing[0].value.is_no_data());
        assert!(nothing[0].delta.is_no_data());
        assert!(nothing[1].value.is_no_data());
        assert!(nothing[1].delta.is_no_data());
    }

    #[test]
    fn test_scatter_keeps_undefined_points() {
        let plot = engine()
            .scatter(
                &ReportRequest::new("revenue"),
                "utilization_rate",
                "revenue",
                "billable_hours",
            )
            .unwrap();
        assert_eq!(plot.points.len(), 4);
        let idle = plot
            .points
            .iter()
            .find(|p| p.period == "January" && p.group == "Corporate & Securities")
            .unwrap();
        assert_eq!(idle.x, Some(0.0));
        assert_eq!(idle.size, Some(0.0));

        assert!(engine()
            .scatter(&ReportRequest::new("revenue"), "nope", "revenue", "billable_hours")
            .is_err());
    }

    #[test]
    fn test_summary() {
        let summary = engine().summary(&ReportRequest::new("billable_hours")).unwrap();
        assert_eq!(summary.sum, Some(600.0));
        assert_eq!(summary.count, 4);
    }
}
