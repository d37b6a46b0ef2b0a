//! Record store: validated, immutable-after-load record sets.

use crate::error::Result;
use practice_domain::{
    CalendarOrder, DomainError, GroupVocabulary, PeriodRecord, RawMetrics, RecordKey,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Raw figures for one period (and optional year), keyed by group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBatch {
    pub period: String,
    pub year: Option<i32>,
    pub groups: Vec<(String, RawMetrics)>,
}

/// Load input: `(period[, year]) -> group -> raw figures`, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSource {
    batches: Vec<PeriodBatch>,
}

impl RawSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a period batch, builder style.
    #[must_use]
    pub fn with_period<I, S>(mut self, period: &str, year: Option<i32>, groups: I) -> Self
    where
        I: IntoIterator<Item = (S, RawMetrics)>,
        S: Into<String>,
    {
        self.push(PeriodBatch {
            period: period.to_string(),
            year,
            groups: groups.into_iter().map(|(g, m)| (g.into(), m)).collect(),
        });
        self
    }

    pub fn push(&mut self, batch: PeriodBatch) {
        self.batches.push(batch);
    }

    pub fn batches(&self) -> &[PeriodBatch] {
        &self.batches
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Ordered, read-only sequence of period records.
///
/// Records keep load insertion order. Calendar ordering is available through
/// [`RecordSet::calendar`]. The calendar and group vocabulary are shared
/// between a set and every set produced from it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    records: Vec<PeriodRecord>,
    calendar: Arc<CalendarOrder>,
    groups: Arc<GroupVocabulary>,
}

impl RecordSet {
    pub(crate) fn with_records(&self, records: Vec<PeriodRecord>) -> Self {
        Self {
            records,
            calendar: Arc::clone(&self.calendar),
            groups: Arc::clone(&self.groups),
        }
    }

    pub fn records(&self) -> &[PeriodRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PeriodRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn calendar(&self) -> &CalendarOrder {
        &self.calendar
    }

    pub fn groups(&self) -> &GroupVocabulary {
        &self.groups
    }

    /// Calendar rank of a record's period. Loaded records always have one.
    pub fn rank_of(&self, record: &PeriodRecord) -> u32 {
        self.calendar.rank(&record.period).unwrap_or(u32::MAX)
    }

    /// Whether records carry a calendar year.
    pub fn tracks_years(&self) -> bool {
        self.records.iter().any(|r| r.year.is_some())
    }

    /// Distinct years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().filter_map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Distinct periods present, in calendar order.
    pub fn periods(&self) -> Vec<String> {
        let mut periods: Vec<&str> = Vec::new();
        for record in &self.records {
            if !periods.contains(&record.period.as_str()) {
                periods.push(&record.period);
            }
        }
        periods.sort_by_key(|p| self.calendar.rank(p).unwrap_or(u32::MAX));
        periods.into_iter().map(String::from).collect()
    }

    /// Whether every record carries stored derived fields.
    pub fn is_derived(&self) -> bool {
        self.records.iter().all(|r| r.derived.is_some())
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a PeriodRecord;
    type IntoIter = std::slice::Iter<'a, PeriodRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Loads raw sources against a configured calendar and group vocabulary.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    calendar: Arc<CalendarOrder>,
    groups: Arc<GroupVocabulary>,
}

impl RecordStore {
    pub fn new(calendar: CalendarOrder, groups: GroupVocabulary) -> Self {
        Self {
            calendar: Arc::new(calendar),
            groups: Arc::new(groups),
        }
    }

    pub fn calendar(&self) -> &CalendarOrder {
        &self.calendar
    }

    pub fn groups(&self) -> &GroupVocabulary {
        &self.groups
    }

    /// Validate and materialize a source. Any failure rejects the whole load.
    pub fn load(&self, source: &RawSource) -> Result<RecordSet> {
        let tracks_years = source.batches.first().is_some_and(|b| b.year.is_some());
        let mut seen: HashSet<RecordKey> = HashSet::new();
        let mut records = Vec::new();

        for batch in &source.batches {
            if !self.calendar.contains(&batch.period) {
                return Err(DomainError::UnrecognizedPeriod(batch.period.clone()).into());
            }
            if batch.year.is_some() != tracks_years {
                let label = match batch.year {
                    Some(year) => format!("{} {year}", batch.period),
                    None => batch.period.clone(),
                };
                return Err(DomainError::InconsistentYears(label).into());
            }

            for (group, raw) in &batch.groups {
                if !self.groups.contains(group) {
                    return Err(DomainError::UnrecognizedGroup {
                        group: group.clone(),
                        period: batch.period.clone(),
                    }
                    .into());
                }
                let record = PeriodRecord::new(&batch.period, group, batch.year, *raw);
                let key = record.key();
                raw.validate(&key)?;
                if !seen.insert(key.clone()) {
                    return Err(DomainError::DuplicateRecord(key.to_string()).into());
                }
                records.push(record);
            }
            debug!(period = %batch.period, year = ?batch.year, groups = batch.groups.len(), "Period batch accepted");
        }

        info!(records = records.len(), tracks_years, "Record set loaded");
        Ok(RecordSet {
            records,
            calendar: Arc::clone(&self.calendar),
            groups: Arc::clone(&self.groups),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;

    fn raw(billable: f64) -> RawMetrics {
        RawMetrics::new(billable, 10.0, billable * 0.9, billable * 500.0)
    }

    #[test]
    fn test_load_preserves_insertion_order() {
        let source = RawSource::new()
            .with_period("March", None, [("Litigation", raw(10.0)), ("Intellectual Property", raw(20.0))])
            .with_period("January", None, [("Litigation", raw(30.0))]);

        let set = RecordStore::default().load(&source).unwrap();
        let labels: Vec<(&str, &str)> = set
            .iter()
            .map(|r| (r.period.as_str(), r.group.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("March", "Litigation"),
                ("March", "Intellectual Property"),
                ("January", "Litigation"),
            ]
        );
        assert_eq!(set.periods(), vec!["January", "March"]);
        assert!(!set.tracks_years());
        assert!(!set.is_derived());
    }

    #[test]
    fn test_load_rejects_negative_value() {
        let source = RawSource::new().with_period(
            "January",
            None,
            [("Litigation", RawMetrics::new(10.0, 0.0, -1.0, 100.0))],
        );
        let err = RecordStore::default().load(&source).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_load_rejects_unknown_group() {
        let source = RawSource::new().with_period("January", None, [("Tax", raw(1.0))]);
        let err = RecordStore::default().load(&source).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Domain(DomainError::UnrecognizedGroup { ref group, .. }) if group == "Tax"
        ));
    }

    #[test]
    fn test_load_rejects_duplicates() {
        let source = RawSource::new()
            .with_period("January", Some(2024), [("Litigation", raw(1.0))])
            .with_period("January", Some(2024), [("Litigation", raw(2.0))]);
        let err = RecordStore::default().load(&source).unwrap_err();
        assert!(matches!(err, AnalyticsError::Domain(DomainError::DuplicateRecord(_))));

        // Same period and group in a different year is a distinct record.
        let source = RawSource::new()
            .with_period("January", Some(2023), [("Litigation", raw(1.0))])
            .with_period("January", Some(2024), [("Litigation", raw(2.0))]);
        let set = RecordStore::default().load(&source).unwrap();
        assert_eq!(set.years(), vec![2023, 2024]);
    }

    #[test]
    fn test_load_rejects_unknown_period_and_mixed_years() {
        let source = RawSource::new().with_period("Jan", None, [("Litigation", raw(1.0))]);
        assert!(RecordStore::default().load(&source).unwrap_err().is_validation());

        let source = RawSource::new()
            .with_period("January", Some(2024), [("Litigation", raw(1.0))])
            .with_period("February", None, [("Litigation", raw(1.0))]);
        let err = RecordStore::default().load(&source).unwrap_err();
        assert!(matches!(err, AnalyticsError::Domain(DomainError::InconsistentYears(_))));
    }

    #[test]
    fn test_load_is_all_or_nothing() {
        let source = RawSource::new()
            .with_period("January", None, [("Litigation", raw(1.0))])
            .with_period("February", None, [("Litigation", RawMetrics::new(f64::INFINITY, 0.0, 0.0, 0.0))]);
        assert!(RecordStore::default().load(&source).is_err());
    }

    #[test]
    fn test_custom_vocabulary() {
        let store = RecordStore::new(
            CalendarOrder::from_labels(["Q1", "Q2"]),
            GroupVocabulary::new(["North", "South"]),
        );
        let source = RawSource::new().with_period("Q2", None, [("South", raw(5.0))]);
        let set = store.load(&source).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.rank_of(&set.records()[0]), 2);
    }
}
