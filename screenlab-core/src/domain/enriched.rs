//! Enriched series — a bar series plus position-aligned indicator columns.
//!
//! Enrichment never reorders or removes bars; every indicator column has
//! exactly the same length as the bar series, with `f64::NAN` marking
//! positions where the warmup window is not yet satisfied. NaN is an
//! internal encoding only: the selector-facing accessors translate it to
//! `None`, so an undefined value can never leak into a comparison as a
//! number.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::bar::Bar;

/// Named indicator columns, each aligned index-for-index with the bars.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    columns: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named column. The caller guarantees alignment with the bars.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.insert(name.into(), values);
    }

    /// Raw value at an index, NaN included. `None` only when the column or
    /// index does not exist.
    pub fn raw(&self, name: &str, idx: usize) -> Option<f64> {
        self.columns.get(name).and_then(|c| c.get(idx).copied())
    }

    /// Defined value at an index: NaN (insufficient warmup) maps to `None`.
    pub fn get(&self, name: &str, idx: usize) -> Option<f64> {
        self.raw(name, idx).filter(|v| !v.is_nan())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn truncate(&mut self, keep: usize) {
        for col in self.columns.values_mut() {
            col.truncate(keep);
        }
    }

    fn drain_front(&mut self, drop: usize) {
        for col in self.columns.values_mut() {
            col.drain(..drop.min(col.len()));
        }
    }
}

/// A bar series with its indicator overlay.
///
/// The screening scheduler hands selectors a series that has already been
/// truncated to the evaluation date and capped to the history window, so a
/// selector can treat "last position" as "as of the evaluation date".
#[derive(Debug, Clone, Default)]
pub struct EnrichedSeries {
    bars: Vec<Bar>,
    values: IndicatorValues,
}

impl EnrichedSeries {
    pub fn new(bars: Vec<Bar>, values: IndicatorValues) -> Self {
        Self { bars, values }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bar(&self, idx: usize) -> Option<&Bar> {
        self.bars.get(idx)
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Defined indicator value at an absolute index (`None` when undefined).
    pub fn value(&self, name: &str, idx: usize) -> Option<f64> {
        self.values.get(name, idx)
    }

    /// Defined indicator value at the last position.
    pub fn latest(&self, name: &str) -> Option<f64> {
        if self.bars.is_empty() {
            return None;
        }
        self.values.get(name, self.bars.len() - 1)
    }

    pub fn indicator_values(&self) -> &IndicatorValues {
        &self.values
    }

    /// Keep only bars dated at or before `cutoff`, indicator columns in
    /// lockstep. Causality guarantees the kept values are unchanged by
    /// dropping later bars.
    pub fn truncate_to(mut self, cutoff: NaiveDate) -> Self {
        let keep = self.bars.partition_point(|b| b.date <= cutoff);
        self.bars.truncate(keep);
        self.values.truncate(keep);
        self
    }

    /// Keep only the most recent `cap` positions, columns in lockstep.
    pub fn tail(mut self, cap: usize) -> Self {
        if self.bars.len() > cap {
            let drop = self.bars.len() - cap;
            self.bars.drain(..drop);
            self.values.drain_front(drop);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn series(n: u32) -> EnrichedSeries {
        let bars: Vec<Bar> = (1..=n)
            .map(|d| Bar {
                date: day(d),
                open: d as f64,
                high: d as f64 + 1.0,
                low: d as f64 - 1.0,
                close: d as f64,
                volume: 1000,
            })
            .collect();
        let mut values = IndicatorValues::new();
        values.insert(
            "ind",
            (0..n).map(|i| if i < 2 { f64::NAN } else { i as f64 }).collect(),
        );
        EnrichedSeries::new(bars, values)
    }

    #[test]
    fn nan_reads_as_none() {
        let s = series(5);
        assert_eq!(s.value("ind", 0), None);
        assert_eq!(s.value("ind", 1), None);
        assert_eq!(s.value("ind", 2), Some(2.0));
        assert!(s.indicator_values().raw("ind", 0).unwrap().is_nan());
    }

    #[test]
    fn missing_column_reads_as_none() {
        let s = series(5);
        assert_eq!(s.value("nope", 0), None);
        assert_eq!(s.latest("nope"), None);
    }

    #[test]
    fn truncate_keeps_dates_at_or_before_cutoff() {
        let s = series(5).truncate_to(day(3));
        assert_eq!(s.len(), 3);
        assert_eq!(s.last_bar().unwrap().date, day(3));
        // Columns shrink in lockstep.
        assert_eq!(s.value("ind", 2), Some(2.0));
        assert_eq!(s.indicator_values().raw("ind", 3), None);
    }

    #[test]
    fn truncate_before_first_bar_yields_empty() {
        let s = series(5).truncate_to(day(1) - chrono::Duration::days(1));
        assert!(s.is_empty());
        assert_eq!(s.latest("ind"), None);
    }

    #[test]
    fn tail_keeps_most_recent_and_realigns() {
        let s = series(5).tail(2);
        assert_eq!(s.len(), 2);
        assert_eq!(s.bar(0).unwrap().date, day(4));
        // Column index 0 now corresponds to the old index 3.
        assert_eq!(s.value("ind", 0), Some(3.0));
        assert_eq!(s.latest("ind"), Some(4.0));
    }

    #[test]
    fn tail_larger_than_series_is_noop() {
        let s = series(3).tail(100);
        assert_eq!(s.len(), 3);
    }
}
