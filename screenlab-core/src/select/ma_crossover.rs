//! Moving average crossover rule — golden cross within a confirmation
//! window.
//!
//! Matches when the fast SMA sits above the slow SMA at the window end
//! and the upward cross happened within the last `confirm_days` bars.
//! A cross that happened long ago (trend already mature) does not match.

use crate::domain::EnrichedSeries;
use crate::indicators::{Indicator, Sma};

use super::Selector;

#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: usize,
    slow: usize,
    confirm_days: usize,
    fast_key: String,
    slow_key: String,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize, confirm_days: usize) -> Self {
        assert!(fast >= 1, "fast period must be >= 1");
        assert!(slow > fast, "slow period must be > fast period");
        assert!(confirm_days >= 1, "confirm_days must be >= 1");
        Self {
            fast,
            slow,
            confirm_days,
            fast_key: format!("sma_{fast}"),
            slow_key: format!("sma_{slow}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(5, 20, 3)
    }
}

impl Selector for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(Sma::new(self.fast)), Box::new(Sma::new(self.slow))]
    }

    fn matches(&self, window: &EnrichedSeries) -> bool {
        let n = window.len();
        if n < 2 {
            return false;
        }
        let last = n - 1;

        // Fast must be above slow as of the evaluation date.
        let (fast_cur, slow_cur) = match (
            window.value(&self.fast_key, last),
            window.value(&self.slow_key, last),
        ) {
            (Some(f), Some(s)) => (f, s),
            _ => return false,
        };
        if fast_cur <= slow_cur {
            return false;
        }

        // The cross itself must have happened within the confirm window.
        let earliest = last.saturating_sub(self.confirm_days - 1).max(1);
        for i in (earliest..=last).rev() {
            let prev = match (
                window.value(&self.fast_key, i - 1),
                window.value(&self.slow_key, i - 1),
            ) {
                (Some(f), Some(s)) => (f, s),
                _ => return false,
            };
            let cur = match (
                window.value(&self.fast_key, i),
                window.value(&self.slow_key, i),
            ) {
                (Some(f), Some(s)) => (f, s),
                _ => return false,
            };
            if cur.0 > cur.1 && prev.0 <= prev.1 {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::test_support::window_for;

    #[test]
    fn fresh_golden_cross_matches() {
        // Downtrend then sharp recovery: fast SMA crosses above slow SMA
        // near the end of the window.
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        closes.extend([75.0, 95.0, 115.0]);
        let sel = MaCrossover::new(3, 10, 3);
        let window = window_for(&sel, &closes);
        assert!(sel.matches(&window));
    }

    #[test]
    fn mature_trend_does_not_match() {
        // Steady uptrend: the cross (if any) happened far outside the
        // confirmation window.
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + i as f64).collect();
        let sel = MaCrossover::new(3, 10, 3);
        let window = window_for(&sel, &closes);
        assert!(!sel.matches(&window));
    }

    #[test]
    fn fast_below_slow_does_not_match() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();
        let sel = MaCrossover::new(3, 10, 3);
        let window = window_for(&sel, &closes);
        assert!(!sel.matches(&window));
    }

    #[test]
    fn insufficient_history_is_no_match() {
        // Too few bars for the slow SMA: every value undefined.
        let closes = [100.0, 101.0, 102.0];
        let sel = MaCrossover::new(3, 10, 3);
        let window = window_for(&sel, &closes);
        assert!(!sel.matches(&window));
    }

    #[test]
    fn empty_window_is_no_match() {
        let sel = MaCrossover::default_params();
        let window = window_for(&sel, &[]);
        assert!(!sel.matches(&window));
    }
}
