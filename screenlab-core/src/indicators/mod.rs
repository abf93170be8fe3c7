//! Indicator precomputation — pure, causal transforms over a bar series.
//!
//! Every indicator turns a full bar series into a numeric column of the
//! same length. The first `lookback()` positions are `f64::NAN` (warmup
//! not satisfied): undefined is encoded explicitly, never as zero. No
//! value at position t may read a bar after t — selectors rely on being
//! able to truncate an enriched series at any date.
//!
//! Enrichment is the dominant per-instrument cost of a scan, so it runs
//! once per series and is shared by every selector (`enrich` +
//! `required_indicators`).

pub mod ema;
pub mod roc;
pub mod rolling_high;
pub mod rsi;
pub mod sma;
pub mod volume_sma;

pub use ema::Ema;
pub use roc::Roc;
pub use rolling_high::RollingHigh;
pub use rsi::Rsi;
pub use sma::Sma;
pub use volume_sma::VolumeSma;

use std::collections::HashSet;

use crate::domain::{Bar, EnrichedSeries, IndicatorValues};

/// Trait for indicators.
///
/// `compute` returns a column of the same length as `bars`, with the
/// first `lookback()` values NaN. Implementations must be strictly
/// causal: the value at index t depends only on `bars[0..=t]`.
pub trait Indicator: Send + Sync {
    /// Column name, parameterized (e.g. "sma_20", "vol_sma_5").
    fn name(&self) -> &str;

    /// Number of leading positions without a defined value.
    fn lookback(&self) -> usize;

    /// Compute the full column for the series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Compute every requested indicator once and overlay the results on the
/// bar series.
///
/// An empty input yields an empty enriched series — downstream treats
/// that as "no match possible", never as an error.
pub fn enrich(bars: Vec<Bar>, indicators: &[Box<dyn Indicator>]) -> EnrichedSeries {
    if bars.is_empty() {
        return EnrichedSeries::default();
    }
    let mut values = IndicatorValues::new();
    for ind in indicators {
        if values.contains(ind.name()) {
            continue;
        }
        let column = ind.compute(&bars);
        debug_assert_eq!(column.len(), bars.len(), "{} misaligned", ind.name());
        values.insert(ind.name(), column);
    }
    EnrichedSeries::new(bars, values)
}

/// Deduplicate (by column name) the indicators a set of selectors needs,
/// so enrichment computes each column exactly once per series.
pub fn dedup_indicators(
    requested: impl IntoIterator<Item = Box<dyn Indicator>>,
) -> Vec<Box<dyn Indicator>> {
    let mut seen = HashSet::new();
    requested
        .into_iter()
        .filter(|ind| seen.insert(ind.name().to_string()))
        .collect()
}

/// Create synthetic bars from close prices for testing.
///
/// Open = previous close (first bar: close), high/low bracket the body by
/// 1.0, volume constant.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn enrich_empty_series_is_empty() {
        let inds: Vec<Box<dyn Indicator>> = vec![Box::new(Sma::new(5))];
        let enriched = enrich(vec![], &inds);
        assert!(enriched.is_empty());
        assert!(enriched.indicator_values().is_empty());
    }

    #[test]
    fn enrich_preserves_length_and_order() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let dates: Vec<_> = bars.iter().map(|b| b.date).collect();
        let inds: Vec<Box<dyn Indicator>> =
            vec![Box::new(Sma::new(3)), Box::new(Roc::new(2))];
        let enriched = enrich(bars, &inds);
        assert_eq!(enriched.len(), 6);
        let out_dates: Vec<_> = enriched.bars().iter().map(|b| b.date).collect();
        assert_eq!(dates, out_dates);
    }

    #[test]
    fn dedup_drops_same_column_name() {
        let inds = dedup_indicators(vec![
            Box::new(Sma::new(20)) as Box<dyn Indicator>,
            Box::new(Sma::new(20)),
            Box::new(Sma::new(5)),
        ]);
        assert_eq!(inds.len(), 2);
    }

    proptest! {
        /// Causality: recomputing on a truncated series must reproduce the
        /// full-series values at every kept index, for every indicator in
        /// the catalog.
        #[test]
        fn truncated_recompute_matches_full(
            closes in proptest::collection::vec(1.0f64..500.0, 1..80),
            cut in 0usize..80,
        ) {
            let bars = make_bars(&closes);
            let cut = cut.min(bars.len());
            let catalog: Vec<Box<dyn Indicator>> = vec![
                Box::new(Sma::new(5)),
                Box::new(Ema::new(5)),
                Box::new(Rsi::new(6)),
                Box::new(VolumeSma::new(5)),
                Box::new(RollingHigh::new(10)),
                Box::new(Roc::new(3)),
            ];
            for ind in &catalog {
                let full = ind.compute(&bars);
                let truncated = ind.compute(&bars[..cut]);
                for i in 0..cut {
                    let (a, b) = (full[i], truncated[i]);
                    prop_assert!(
                        (a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-9,
                        "{} diverges at {}: full={}, truncated={}", ind.name(), i, a, b
                    );
                }
            }
        }
    }
}
