//! # Practice Group Analytics - Domain Model
//!
//! Core records, value objects, and vocabularies for practice-group
//! performance reporting. These types are the single source of truth
//! across all layers: the analytics engine, the reporting facade, and
//! the fixture tooling.
//!
//! A [`PeriodRecord`] holds the raw figures for one practice group in one
//! period (and optionally one calendar year). The ratios derived from
//! those figures live in [`DerivedMetrics`]; a ratio whose denominator is
//! zero is `None`, which every consumer must treat as "no data" rather
//! than zero.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CALENDAR
// =============================================================================

/// Month labels in calendar order. Rank is index + 1.
pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Explicit lookup table from period label to its calendar rank.
///
/// Time-series consumers sort by this table, never by insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOrder {
    labels: Vec<String>,
    ranks: HashMap<String, u32>,
}

impl CalendarOrder {
    /// The twelve calendar months, `January => 1` through `December => 12`.
    #[must_use]
    pub fn months() -> Self {
        Self::from_labels(MONTHS)
    }

    /// Build a table from labels given in order. Repeated labels keep their
    /// first rank.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut ranks = HashMap::new();
        for label in labels {
            let label = label.into();
            if ranks.contains_key(&label) {
                continue;
            }
            ordered.push(label.clone());
            ranks.insert(label, u32::try_from(ordered.len()).unwrap_or(u32::MAX));
        }
        Self {
            labels: ordered,
            ranks,
        }
    }

    /// 1-based rank of `label`, or `None` if the label is not a known period.
    #[must_use]
    pub fn rank(&self, label: &str) -> Option<u32> {
        self.ranks.get(label).copied()
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.ranks.contains_key(label)
    }

    /// `(label, rank)` pairs in calendar order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.labels
            .iter()
            .map(|label| (label.as_str(), self.ranks[label.as_str()]))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for CalendarOrder {
    fn default() -> Self {
        Self::months()
    }
}

// =============================================================================
// GROUP VOCABULARY
// =============================================================================

/// Practice groups of the reference dataset.
pub const DEFAULT_PRACTICE_GROUPS: [&str; 5] = [
    "Corporate & Securities",
    "Fintech & Financial Services",
    "Intellectual Property",
    "Litigation",
    "Real Estate & Land Use",
];

/// The fixed set of group names a load accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVocabulary {
    groups: Vec<String>,
}

impl GroupVocabulary {
    /// Build a vocabulary, dropping repeated names.
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for group in groups {
            let group = group.into();
            if !unique.contains(&group) {
                unique.push(group);
            }
        }
        Self { groups: unique }
    }

    #[must_use]
    pub fn contains(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for GroupVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_PRACTICE_GROUPS)
    }
}

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Identity of a record: `(period, group)` or `(period, group, year)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub period: String,
    pub group: String,
    pub year: Option<i32>,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} {} / {}", self.period, year, self.group),
            None => write!(f, "{} / {}", self.period, self.group),
        }
    }
}

/// Raw figures observed for one group in one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub billable_hours: f64,
    pub non_billable_hours: f64,
    pub billed_hours: f64,
    pub revenue: f64,
}

impl RawMetrics {
    #[must_use]
    pub const fn new(
        billable_hours: f64,
        non_billable_hours: f64,
        billed_hours: f64,
        revenue: f64,
    ) -> Self {
        Self {
            billable_hours,
            non_billable_hours,
            billed_hours,
            revenue,
        }
    }

    fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("billable_hours", self.billable_hours),
            ("non_billable_hours", self.non_billable_hours),
            ("billed_hours", self.billed_hours),
            ("revenue", self.revenue),
        ]
    }

    /// Reject non-finite or negative figures.
    pub fn validate(&self, key: &RecordKey) -> Result<(), DomainError> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(DomainError::NonFiniteValue {
                    field,
                    key: key.to_string(),
                });
            }
            if value < 0.0 {
                return Err(DomainError::NegativeValue {
                    field,
                    value,
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl From<[f64; 4]> for RawMetrics {
    fn from([billable, non_billable, billed, revenue]: [f64; 4]) -> Self {
        Self::new(billable, non_billable, billed, revenue)
    }
}

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn rounded_ratio(numerator: f64, denominator: f64, scale: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(round2(numerator / denominator * scale))
    }
}

/// Ratios derived from [`RawMetrics`]. `None` marks an undefined value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// `billable + non_billable`, exact
    pub total_hours: f64,
    pub utilization_rate: Option<f64>,
    pub realization_rate: Option<f64>,
    pub average_hourly_rate: Option<f64>,
}

impl DerivedMetrics {
    /// Derive every ratio from raw figures. Rates are rounded once, here.
    #[must_use]
    pub fn from_raw(raw: &RawMetrics) -> Self {
        let total_hours = raw.billable_hours + raw.non_billable_hours;
        Self {
            total_hours,
            utilization_rate: rounded_ratio(raw.billable_hours, total_hours, 100.0),
            realization_rate: rounded_ratio(raw.billed_hours, raw.billable_hours, 100.0),
            average_hourly_rate: rounded_ratio(raw.revenue, raw.billable_hours, 1.0),
        }
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// One observation for a (period, group[, year]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub period: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(flatten)]
    pub raw: RawMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedMetrics>,
}

impl PeriodRecord {
    pub fn new(
        period: impl Into<String>,
        group: impl Into<String>,
        year: Option<i32>,
        raw: RawMetrics,
    ) -> Self {
        Self {
            period: period.into(),
            group: group.into(),
            year,
            raw,
            derived: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey {
            period: self.period.clone(),
            group: self.group.clone(),
            year: self.year,
        }
    }

    /// Stored derived fields, or a fresh derivation when the record has not
    /// been through the deriver yet.
    #[must_use]
    pub fn derived_metrics(&self) -> DerivedMetrics {
        self.derived
            .unwrap_or_else(|| DerivedMetrics::from_raw(&self.raw))
    }

    /// Value of `metric` for this record; `None` when undefined.
    #[must_use]
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::BillableHours => Some(self.raw.billable_hours),
            Metric::NonBillableHours => Some(self.raw.non_billable_hours),
            Metric::BilledHours => Some(self.raw.billed_hours),
            Metric::Revenue => Some(self.raw.revenue),
            Metric::TotalHours => Some(self.derived_metrics().total_hours),
            Metric::UtilizationRate => self.derived_metrics().utilization_rate,
            Metric::RealizationRate => self.derived_metrics().realization_rate,
            Metric::AverageHourlyRate => self.derived_metrics().average_hourly_rate,
        }
    }

    /// Label of this record along `dimension`; `None` for `Year` on an
    /// untracked record.
    #[must_use]
    pub fn dimension_value(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::Period => Some(self.period.clone()),
            Dimension::Group => Some(self.group.clone()),
            Dimension::Year => self.year.map(|y| y.to_string()),
        }
    }
}

// =============================================================================
// METRIC REGISTRY
// =============================================================================

/// Formatting unit attached to every metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Currency,
    Percent,
    Hours,
    Count,
}

/// Rendered for undefined values.
pub const NO_DATA: &str = "—";

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Currency => "currency",
            Self::Percent => "percent",
            Self::Hours => "hours",
            Self::Count => "count",
        }
    }

    /// Render a value for display. `None` renders as [`NO_DATA`].
    #[must_use]
    pub fn format(&self, value: Option<f64>) -> String {
        let Some(value) = value else {
            return NO_DATA.to_string();
        };
        match self {
            Self::Currency => {
                let (sign, digits) = with_thousands(value, 2);
                format!("{sign}${digits}")
            }
            Self::Percent => format!("{value:.1}%"),
            Self::Hours => {
                let (sign, digits) = with_thousands(value, 2);
                format!("{sign}{digits}")
            }
            Self::Count => {
                let (sign, digits) = with_thousands(value, 0);
                format!("{sign}{digits}")
            }
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn with_thousands(value: f64, decimals: usize) -> (&'static str, String) {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    (sign, out)
}

/// Every metric the engine can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    BillableHours,
    NonBillableHours,
    BilledHours,
    TotalHours,
    Revenue,
    UtilizationRate,
    RealizationRate,
    AverageHourlyRate,
}

/// Registry entry: key, display label, and unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: Unit,
}

impl Metric {
    pub const ALL: [Self; 8] = [
        Self::BillableHours,
        Self::NonBillableHours,
        Self::BilledHours,
        Self::TotalHours,
        Self::Revenue,
        Self::UtilizationRate,
        Self::RealizationRate,
        Self::AverageHourlyRate,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::BillableHours => "billable_hours",
            Self::NonBillableHours => "non_billable_hours",
            Self::BilledHours => "billed_hours",
            Self::TotalHours => "total_hours",
            Self::Revenue => "revenue",
            Self::UtilizationRate => "utilization_rate",
            Self::RealizationRate => "realization_rate",
            Self::AverageHourlyRate => "average_hourly_rate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::BillableHours => "Billable Hours",
            Self::NonBillableHours => "Non-Billable Hours",
            Self::BilledHours => "Billed Hours",
            Self::TotalHours => "Total Hours",
            Self::Revenue => "Revenue ($)",
            Self::UtilizationRate => "Utilization Rate (%)",
            Self::RealizationRate => "Realization Rate (%)",
            Self::AverageHourlyRate => "Average Hourly Rate",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Self::BillableHours | Self::NonBillableHours | Self::BilledHours | Self::TotalHours => {
                Unit::Hours
            }
            Self::Revenue | Self::AverageHourlyRate => Unit::Currency,
            Self::UtilizationRate | Self::RealizationRate => Unit::Percent,
        }
    }

    #[must_use]
    pub fn info(&self) -> MetricInfo {
        MetricInfo {
            key: self.key(),
            label: self.label(),
            unit: self.unit(),
        }
    }

    /// Look up a metric by registry key.
    pub fn from_key(key: &str) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|m| m.key() == key)
            .ok_or_else(|| DomainError::UnknownKey {
                kind: KeyKind::Metric,
                key: key.to_string(),
            })
    }
}

impl FromStr for Metric {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The full registry in declaration order.
#[must_use]
pub fn metric_registry() -> Vec<MetricInfo> {
    Metric::ALL.iter().map(Metric::info).collect()
}

// =============================================================================
// QUERY VOCABULARY
// =============================================================================

/// Categorical dimension a query can group or pivot by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Period,
    Group,
    Year,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Period => "period",
            Self::Group => "group",
            Self::Year => "year",
        }
    }
}

impl FromStr for Dimension {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "period" => Ok(Self::Period),
            "group" => Ok(Self::Group),
            "year" => Ok(Self::Year),
            other => Err(DomainError::UnknownKey {
                kind: KeyKind::Dimension,
                key: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// What kind of name failed a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Metric,
    Group,
    Period,
    Year,
    Dimension,
    Aggregation,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Metric => "metric",
            Self::Group => "group",
            Self::Period => "period",
            Self::Year => "year",
            Self::Dimension => "dimension",
            Self::Aggregation => "aggregation",
        })
    }
}

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Validation failed for {key}: {field} is negative ({value})")]
    NegativeValue {
        field: &'static str,
        value: f64,
        key: String,
    },

    #[error("Validation failed for {key}: {field} is not a finite number")]
    NonFiniteValue { field: &'static str, key: String },

    #[error("Validation failed: group '{group}' is not in the configured vocabulary ({period})")]
    UnrecognizedGroup { group: String, period: String },

    #[error("Validation failed: period '{0}' is not in the calendar table")]
    UnrecognizedPeriod(String),

    #[error("Validation failed: duplicate record {0}")]
    DuplicateRecord(String),

    #[error("Validation failed: {0} mixes year-tracked and untracked periods")]
    InconsistentYears(String),

    #[error("Unknown {kind} key: '{key}'")]
    UnknownKey { kind: KeyKind, key: String },
}

impl DomainError {
    /// True for every load-time validation failure.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::UnknownKey { .. })
    }

    pub fn unknown(kind: KeyKind, key: impl Into<String>) -> Self {
        Self::UnknownKey {
            kind,
            key: key.into(),
        }
    }
}
