//! Display-ready tables handed to the presentation layer.
//!
//! Every numeric cell is a [`DisplayValue`]: the raw value (or `None` for no
//! data) plus the unit that says how to format it.

use crate::queries::Aggregation;
use practice_domain::{Dimension, MetricInfo, Unit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw value with its formatting hint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayValue {
    pub value: Option<f64>,
    pub unit: Unit,
}

impl DisplayValue {
    pub const fn new(value: Option<f64>, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub const fn no_data(unit: Unit) -> Self {
        Self { value: None, unit }
    }

    pub fn is_no_data(&self) -> bool {
        self.value.is_none()
    }

    pub fn formatted(&self) -> String {
        self.unit.format(self.value)
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

/// One point of a per-group time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub period: String,
    pub year: Option<i32>,
    pub group: String,
    pub value: DisplayValue,
}

/// Metric values over time, one point per record, in calendar order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub metric: MetricInfo,
    pub points: Vec<TimePoint>,
}

/// One row of a grouped summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub key: String,
    pub count: usize,
    pub sum: DisplayValue,
    pub mean: DisplayValue,
    /// Share of the total sum, in percent
    pub share_pct: DisplayValue,
}

/// Metric summarized per value of a dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownTable {
    pub metric: MetricInfo,
    pub dimension: Dimension,
    pub rows: Vec<BreakdownRow>,
    pub total: DisplayValue,
}

/// Column header of the detailed metrics table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsColumn {
    pub metric: MetricInfo,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub group: String,
    pub values: Vec<DisplayValue>,
}

/// Several metrics side by side, one row per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsTable {
    pub columns: Vec<MetricsColumn>,
    pub rows: Vec<MetricsRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotViewRow {
    pub key: String,
    pub cells: Vec<DisplayValue>,
}

/// Pivot table ready for a cross-tab or heatmap view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotView {
    pub metric: MetricInfo,
    pub aggregation: Aggregation,
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    pub columns: Vec<String>,
    pub rows: Vec<PivotViewRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YoyViewRow {
    pub period: String,
    pub base: DisplayValue,
    pub compare: DisplayValue,
    pub growth_pct: DisplayValue,
}

/// Year-over-year growth per period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YoyTable {
    pub metric: MetricInfo,
    pub base_year: i32,
    pub compare_year: i32,
    pub rows: Vec<YoyViewRow>,
}

/// Headline indicator with a comparison figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub key: &'static str,
    pub label: &'static str,
    pub value: DisplayValue,
    pub delta: DisplayValue,
    pub delta_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub period: String,
    pub year: Option<i32>,
    pub group: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub size: Option<f64>,
}

/// Per-record points relating two metrics, sized by a third.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPlot {
    pub x: MetricInfo,
    pub y: MetricInfo,
    pub size: MetricInfo,
    pub points: Vec<ScatterPoint>,
}
