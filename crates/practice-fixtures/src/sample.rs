//! Sample dataset generation. NON-PRODUCTION: figures after the reference
//! January are synthetic.

use practice_analytics::RawSource;
use practice_domain::{MONTHS, RawMetrics, round2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use tracing::debug;

/// January figures of the reference dataset:
/// `[billable, non_billable, billed, revenue]` per practice group.
pub const REFERENCE_JANUARY: [(&str, [f64; 4]); 5] = [
    ("Corporate & Securities", [1421.10, 0.0, 994.5, 889_180.84]),
    ("Fintech & Financial Services", [170.30, 0.0, 114.40, 152_508.27]),
    ("Intellectual Property", [530.10, 0.0, 384.50, 343_759.88]),
    ("Litigation", [604.00, 0.0, 594.00, 357_942.29]),
    ("Real Estate & Land Use", [242.80, 0.0, 153.20, 122_155.65]),
];

/// Annual growth applied to each later year of a multi-year sample.
const ANNUAL_GROWTH: f64 = 0.08;

/// The reference January as loader input.
pub fn reference_january() -> Vec<(String, RawMetrics)> {
    REFERENCE_JANUARY
        .iter()
        .map(|(group, raw)| ((*group).to_string(), RawMetrics::from(*raw)))
        .collect()
}

/// Seeded generator of plausible monthly figures around the reference
/// January. Same seed, same dataset.
pub struct SampleGenerator {
    rng: StdRng,
    months: usize,
    years: Vec<i32>,
}

impl SampleGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            months: MONTHS.len(),
            years: Vec::new(),
        }
    }

    /// Number of months from January, clamped to `1..=12`.
    #[must_use]
    pub fn with_months(mut self, months: usize) -> Self {
        self.months = months.clamp(1, MONTHS.len());
        self
    }

    /// Track these calendar years. Empty means a single untracked year.
    #[must_use]
    pub fn with_years(mut self, mut years: Vec<i32>) -> Self {
        years.sort_unstable();
        years.dedup();
        self.years = years;
        self
    }

    /// Multiplicative noise around 1.0, floored at 0.2.
    fn jitter(&mut self, spread: f64) -> f64 {
        Normal::new(1.0, spread)
            .map_or(1.0, |noise| self.rng.sample(noise))
            .max(0.2)
    }

    fn month_figures(&mut self, reference: [f64; 4], growth: f64) -> RawMetrics {
        let [billable, _, billed, revenue] = reference;
        let realization = (billed / billable).min(1.0);
        let rate = revenue / billed;

        let billable = round2(billable * growth * self.jitter(0.12));
        let non_billable = round2(billable * self.rng.gen_range(0.05..0.25));
        let billed = round2(billable * (realization * self.jitter(0.05)).min(1.0));
        let revenue = round2(billed * rate * self.jitter(0.05));
        RawMetrics::new(billable, non_billable, billed, revenue)
    }

    /// Build the full source. The first January is the reference data
    /// verbatim.
    #[allow(clippy::cast_precision_loss)]
    pub fn generate(&mut self) -> RawSource {
        let years: Vec<Option<i32>> = if self.years.is_empty() {
            vec![None]
        } else {
            self.years.iter().copied().map(Some).collect()
        };

        let mut source = RawSource::new();
        for (year_index, year) in years.into_iter().enumerate() {
            let growth = (1.0 + ANNUAL_GROWTH).powi(i32::try_from(year_index).unwrap_or(i32::MAX));
            for (month_index, month) in MONTHS.iter().take(self.months).enumerate() {
                let groups: Vec<(String, RawMetrics)> = if year_index == 0 && month_index == 0 {
                    reference_january()
                } else {
                    REFERENCE_JANUARY
                        .iter()
                        .map(|(group, raw)| ((*group).to_string(), self.month_figures(*raw, growth)))
                        .collect()
                };
                source = source.with_period(month, year, groups);
            }
            debug!(?year, months = self.months, "Sample year generated");
        }
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_analytics::RecordStore;

    #[test]
    fn test_reference_january_loads() {
        let source = RawSource::new().with_period("January", None, reference_january());
        let set = RecordStore::default().load(&source).unwrap();
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_generated_sample_is_valid() {
        let source = SampleGenerator::new(7).generate();
        let set = RecordStore::default().load(&source).unwrap();
        assert_eq!(set.len(), 12 * 5);
        assert!(!set.tracks_years());
        assert_eq!(set.records()[3].raw, RawMetrics::new(604.00, 0.0, 594.00, 357_942.29));
        assert!(set.iter().all(|r| r.raw.billed_hours <= r.raw.billable_hours));
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = SampleGenerator::new(42).with_months(3).generate();
        let b = SampleGenerator::new(42).with_months(3).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_multi_year_sample() {
        let source = SampleGenerator::new(1)
            .with_months(2)
            .with_years(vec![2024, 2023, 2024])
            .generate();
        let set = RecordStore::default().load(&source).unwrap();
        assert_eq!(set.years(), vec![2023, 2024]);
        assert_eq!(set.len(), 2 * 2 * 5);
    }

    #[test]
    fn test_jitter_is_centred_on_one() {
        let mut generator = SampleGenerator::new(11);
        let draws: Vec<f64> = (0..2000).map(|_| generator.jitter(0.05)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - 1.0).abs() < 0.01);
        assert!(draws.iter().all(|d| *d >= 0.2));
        assert!(draws.iter().any(|d| (*d - 1.0).abs() > 1e-6));
    }

    #[test]
    fn test_months_are_clamped() {
        let source = SampleGenerator::new(3).with_months(40).generate();
        assert_eq!(source.batches().len(), 12);
        let source = SampleGenerator::new(3).with_months(0).generate();
        assert_eq!(source.batches().len(), 1);
    }
}
