//! Metric deriver.

use crate::store::RecordSet;
use practice_domain::{DerivedMetrics, PeriodRecord};
use tracing::{debug, info};

/// Compute derived fields for every record and return a new set.
///
/// Derivation reads raw fields only, so re-deriving an already derived set
/// reproduces the same values.
pub fn derive(records: &RecordSet) -> RecordSet {
    let mut undefined = 0usize;
    let derived: Vec<PeriodRecord> = records
        .iter()
        .map(|record| {
            let metrics = DerivedMetrics::from_raw(&record.raw);
            undefined += [
                metrics.utilization_rate,
                metrics.realization_rate,
                metrics.average_hourly_rate,
            ]
            .iter()
            .filter(|v| v.is_none())
            .count();
            if metrics.realization_rate.is_none() {
                debug!(period = %record.period, group = %record.group, "No billable hours; rates undefined");
            }
            PeriodRecord {
                derived: Some(metrics),
                ..record.clone()
            }
        })
        .collect();

    info!(records = derived.len(), undefined, "Derived metrics computed");
    records.with_records(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RawSource, RecordStore};
    use practice_domain::RawMetrics;

    fn sample() -> RecordSet {
        let source = RawSource::new()
            .with_period(
                "January",
                None,
                [
                    ("Litigation", RawMetrics::new(604.00, 0.0, 594.00, 357_942.29)),
                    ("Intellectual Property", RawMetrics::new(0.0, 40.0, 0.0, 0.0)),
                ],
            );
        RecordStore::default().load(&source).unwrap()
    }

    #[test]
    fn test_derive_does_not_mutate_input() {
        let raw = sample();
        let derived = derive(&raw);
        assert!(!raw.is_derived());
        assert!(derived.is_derived());
        assert_eq!(raw.len(), derived.len());
    }

    #[test]
    fn test_derive_values() {
        let derived = derive(&sample());
        let litigation = derived.records()[0].derived.unwrap();
        assert_eq!(litigation.total_hours, 604.00);
        assert_eq!(litigation.utilization_rate, Some(100.00));
        assert_eq!(litigation.realization_rate, Some(98.34));
        assert_eq!(litigation.average_hourly_rate, Some(592.62));

        let ip = derived.records()[1].derived.unwrap();
        assert_eq!(ip.utilization_rate, Some(0.0));
        assert_eq!(ip.realization_rate, None);
        assert_eq!(ip.average_hourly_rate, None);
    }

    #[test]
    fn test_derive_is_idempotent() {
        let once = derive(&sample());
        let twice = derive(&once);
        assert_eq!(once, twice);
    }
}
