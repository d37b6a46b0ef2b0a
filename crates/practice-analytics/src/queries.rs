//! Query engine: filtering, aggregation, pivoting, and year-over-year growth.
//!
//! Every operation takes a record set by reference and returns new data.
//! Undefined metric values are skipped by sums and means and never counted
//! as zero. A bucket with no defined values reports `None` ("no data").

use crate::error::{AnalyticsError, Result};
use crate::store::RecordSet;
use practice_domain::{Dimension, DomainError, KeyKind, Metric, PeriodRecord};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

// =============================================================================
// SELECTION
// =============================================================================

/// Allowed periods, groups, and optionally years.
///
/// Empty `periods` or `groups` select nothing. `years: None` means no year
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub periods: BTreeSet<String>,
    pub groups: BTreeSet<String>,
    pub years: Option<BTreeSet<i32>>,
}

impl Selection {
    pub fn new<P, G>(periods: P, groups: G) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Self {
            periods: periods.into_iter().map(Into::into).collect(),
            groups: groups.into_iter().map(Into::into).collect(),
            years: None,
        }
    }

    #[must_use]
    pub fn with_years<I: IntoIterator<Item = i32>>(mut self, years: I) -> Self {
        self.years = Some(years.into_iter().collect());
        self
    }

    /// Every calendar period and configured group, with no year filter.
    pub fn everything(records: &RecordSet) -> Self {
        Self::new(
            records.calendar().entries().map(|(label, _)| label),
            records.groups().iter(),
        )
    }

    /// Fail on any period or group name the record set cannot know about.
    pub fn validate(&self, records: &RecordSet) -> Result<()> {
        if let Some(period) = self.periods.iter().find(|p| !records.calendar().contains(p)) {
            return Err(DomainError::unknown(KeyKind::Period, period.as_str()).into());
        }
        if let Some(group) = self.groups.iter().find(|g| !records.groups().contains(g)) {
            return Err(DomainError::unknown(KeyKind::Group, group.as_str()).into());
        }
        Ok(())
    }

    pub fn matches(&self, record: &PeriodRecord) -> bool {
        self.periods.contains(&record.period)
            && self.groups.contains(&record.group)
            && self
                .years
                .as_ref()
                .is_none_or(|years| record.year.is_some_and(|y| years.contains(&y)))
    }
}

/// Keep the records matching `selection`.
pub fn select(records: &RecordSet, selection: &Selection) -> Result<RecordSet> {
    selection.validate(records)?;
    let kept: Vec<PeriodRecord> = records
        .iter()
        .filter(|r| selection.matches(r))
        .cloned()
        .collect();
    debug!(input = records.len(), kept = kept.len(), "Selection applied");
    Ok(records.with_records(kept))
}

// =============================================================================
// SUMMARIES
// =============================================================================

/// Aggregation applied to a bucket of metric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
    Count,
    Min,
    Max,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl FromStr for Aggregation {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "count" => Ok(Self::Count),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(DomainError::unknown(KeyKind::Aggregation, other)),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary statistics over the defined values of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of defined values
    pub count: usize,
    /// Number of undefined values skipped
    pub undefined: usize,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sample standard deviation; needs two values
    pub std_dev: Option<f64>,
}

impl Summary {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut undefined = 0usize;
        let defined: Vec<f64> = values
            .into_iter()
            .filter_map(|v| {
                if v.is_none() {
                    undefined += 1;
                }
                v
            })
            .collect();

        if defined.is_empty() {
            return Self {
                count: 0,
                undefined,
                sum: None,
                mean: None,
                min: None,
                max: None,
                std_dev: None,
            };
        }

        Self {
            count: defined.len(),
            undefined,
            sum: Some(defined.iter().sum()),
            mean: Some(Statistics::mean(defined.iter())),
            min: Some(Statistics::min(defined.iter())),
            max: Some(Statistics::max(defined.iter())),
            std_dev: (defined.len() > 1).then(|| Statistics::std_dev(defined.iter())),
        }
    }

    /// No defined values.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn get(&self, aggregation: Aggregation) -> Option<f64> {
        match aggregation {
            Aggregation::Sum => self.sum,
            Aggregation::Mean => self.mean,
            Aggregation::Count => Some(self.count as f64),
            Aggregation::Min => self.min,
            Aggregation::Max => self.max,
        }
    }
}

/// Summary of `metric` over the whole record set.
pub fn summarize(records: &RecordSet, metric: Metric) -> Summary {
    Summary::from_values(records.iter().map(|r| r.metric(metric)))
}

/// One bucket of an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: String,
    pub summary: Summary,
}

/// Split records by `dimension`. Buckets follow first-seen order, except
/// periods, which follow calendar order.
fn dimension_buckets(
    records: &RecordSet,
    dimension: Dimension,
) -> Result<Vec<(String, Vec<&PeriodRecord>)>> {
    if dimension == Dimension::Year && !records.is_empty() && !records.tracks_years() {
        return Err(AnalyticsError::InvalidParameter(
            "record set does not track years".to_string(),
        ));
    }

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<&PeriodRecord>> = HashMap::new();
    for record in records {
        let Some(key) = record.dimension_value(dimension) else {
            continue;
        };
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(record);
    }

    if dimension == Dimension::Period {
        let calendar = records.calendar();
        order.sort_by_key(|p| calendar.rank(p).unwrap_or(u32::MAX));
    }

    Ok(order
        .into_iter()
        .map(|key| {
            let members = buckets.remove(&key).unwrap_or_default();
            (key, members)
        })
        .collect())
}

/// Summaries of `metric` per value of `dimension`.
pub fn aggregate(
    records: &RecordSet,
    metric: Metric,
    dimension: Dimension,
) -> Result<Vec<GroupSummary>> {
    let rows: Vec<GroupSummary> = dimension_buckets(records, dimension)?
        .into_iter()
        .map(|(key, members)| GroupSummary {
            key,
            summary: Summary::from_values(members.iter().map(|r| r.metric(metric))),
        })
        .collect();
    debug!(%metric, %dimension, buckets = rows.len(), "Aggregate computed");
    Ok(rows)
}

// =============================================================================
// PIVOT
// =============================================================================

/// Cross-tabulation of a metric. `None` cells have no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotTable {
    pub metric: Metric,
    pub aggregation: Aggregation,
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `cells[row][column]`
    pub cells: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    /// Cell value at `(row, column)`; `None` when missing or without data.
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|k| k == row)?;
        let c = self.columns.iter().position(|k| k == column)?;
        self.cells[r][c]
    }

    pub fn row(&self, row: &str) -> Option<&[Option<f64>]> {
        let r = self.rows.iter().position(|k| k == row)?;
        Some(&self.cells[r])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pivot `metric` into a `row_dimension` x `column_dimension` table.
pub fn pivot(
    records: &RecordSet,
    metric: Metric,
    row_dimension: Dimension,
    column_dimension: Dimension,
    aggregation: Aggregation,
) -> Result<PivotTable> {
    if row_dimension == column_dimension {
        return Err(AnalyticsError::InvalidParameter(format!(
            "pivot needs two distinct dimensions, got {row_dimension} twice"
        )));
    }

    let rows = dimension_buckets(records, row_dimension)?;
    let columns: Vec<String> = dimension_buckets(records, column_dimension)?
        .into_iter()
        .map(|(key, _)| key)
        .collect();

    let cells: Vec<Vec<Option<f64>>> = rows
        .iter()
        .map(|(_, members)| {
            columns
                .iter()
                .map(|column| {
                    let values: Vec<Option<f64>> = members
                        .iter()
                        .filter(|r| r.dimension_value(column_dimension).as_deref() == Some(column.as_str()))
                        .map(|r| r.metric(metric))
                        .collect();
                    if values.is_empty() {
                        None
                    } else {
                        Summary::from_values(values).get(aggregation)
                    }
                })
                .collect()
        })
        .collect();

    debug!(
        %metric,
        rows = rows.len(),
        columns = columns.len(),
        "Pivot computed"
    );

    Ok(PivotTable {
        metric,
        aggregation,
        row_dimension,
        column_dimension,
        rows: rows.into_iter().map(|(key, _)| key).collect(),
        columns,
        cells,
    })
}

// =============================================================================
// YEAR OVER YEAR
// =============================================================================

/// Growth of one period between two years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoyRow {
    pub period: String,
    pub base: Option<f64>,
    pub compare: Option<f64>,
    pub growth_pct: Option<f64>,
}

/// Percentage change from `base` to `compare`; `None` when `base` is zero.
pub fn growth_pct(base: f64, compare: f64) -> Option<f64> {
    if base == 0.0 {
        None
    } else {
        Some((compare - base) / base * 100.0)
    }
}

/// Per-period growth of the summed metric from `base_year` to `compare_year`.
///
/// Rows cover every period present in either year, in calendar order.
pub fn yoy(
    records: &RecordSet,
    metric: Metric,
    base_year: i32,
    compare_year: i32,
) -> Result<Vec<YoyRow>> {
    if base_year == compare_year {
        return Err(AnalyticsError::InvalidParameter(format!(
            "base and compare year are both {base_year}"
        )));
    }
    if !records.is_empty() && !records.tracks_years() {
        return Err(AnalyticsError::InvalidParameter(
            "record set does not track years".to_string(),
        ));
    }

    let in_scope: Vec<&PeriodRecord> = records
        .iter()
        .filter(|r| r.year == Some(base_year) || r.year == Some(compare_year))
        .collect();

    let mut periods: Vec<&str> = Vec::new();
    for record in &in_scope {
        if !periods.contains(&record.period.as_str()) {
            periods.push(&record.period);
        }
    }
    let calendar = records.calendar();
    periods.sort_by_key(|p| calendar.rank(p).unwrap_or(u32::MAX));

    let period_sum = |period: &str, year: i32| -> Option<f64> {
        Summary::from_values(
            in_scope
                .iter()
                .filter(|r| r.period == period && r.year == Some(year))
                .map(|r| r.metric(metric)),
        )
        .sum
    };

    let rows = periods
        .into_iter()
        .map(|period| {
            let base = period_sum(period, base_year);
            let compare = period_sum(period, compare_year);
            let growth = match (base, compare) {
                (Some(b), Some(c)) => {
                    let growth = growth_pct(b, c);
                    if growth.is_none() {
                        warn!(period, base_year, %metric, "Base period sums to zero; growth undefined");
                    }
                    growth
                }
                _ => None,
            };
            YoyRow {
                period: period.to_string(),
                base,
                compare,
                growth_pct: growth,
            }
        })
        .collect();

    Ok(rows)
}
