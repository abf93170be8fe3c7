//! Breakout rule — close above the trailing N-day high.
//!
//! Matches when the latest close exceeds the highest high of the
//! previous `lookback` bars (current bar excluded) by at least
//! `threshold_pct` percent.

use crate::domain::EnrichedSeries;
use crate::indicators::{Indicator, RollingHigh};

use super::Selector;

#[derive(Debug, Clone)]
pub struct Breakout {
    lookback: usize,
    threshold_pct: f64,
    high_key: String,
}

impl Breakout {
    pub fn new(lookback: usize, threshold_pct: f64) -> Self {
        assert!(lookback >= 1, "lookback must be >= 1");
        Self {
            lookback,
            threshold_pct,
            high_key: format!("roll_high_{lookback}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(60, 0.0)
    }
}

impl Selector for Breakout {
    fn name(&self) -> &str {
        "breakout"
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(RollingHigh::new(self.lookback))]
    }

    fn matches(&self, window: &EnrichedSeries) -> bool {
        let last_bar = match window.last_bar() {
            Some(bar) => bar,
            None => return false,
        };
        let reference = match window.latest(&self.high_key) {
            Some(v) if v > 0.0 => v,
            _ => return false,
        };
        last_bar.close > reference * (1.0 + self.threshold_pct / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::test_support::window_for;

    #[test]
    fn new_high_matches() {
        // Range-bound, then a close above every prior high.
        let closes = [10.0, 11.0, 10.5, 10.8, 10.2, 10.9, 12.5];
        let sel = Breakout::new(5, 0.0);
        let window = window_for(&sel, &closes);
        assert!(sel.matches(&window));
    }

    #[test]
    fn inside_range_does_not_match() {
        let closes = [10.0, 11.0, 10.5, 10.8, 10.2, 10.9, 10.7];
        let sel = Breakout::new(5, 0.0);
        let window = window_for(&sel, &closes);
        assert!(!sel.matches(&window));
    }

    #[test]
    fn threshold_raises_the_bar() {
        // Close beats the prior high by ~2.6%, below a 5% threshold.
        let closes = [10.0, 11.0, 10.5, 10.8, 10.2, 10.9, 11.3];
        let strict = Breakout::new(5, 5.0);
        let window = window_for(&strict, &closes);
        assert!(!strict.matches(&window));

        let loose = Breakout::new(5, 2.0);
        let window = window_for(&loose, &closes);
        assert!(loose.matches(&window));
    }

    #[test]
    fn warmup_is_no_match() {
        let closes = [10.0, 12.0, 14.0];
        let sel = Breakout::new(5, 0.0);
        let window = window_for(&sel, &closes);
        assert!(!sel.matches(&window));
    }

    #[test]
    fn empty_window_is_no_match() {
        let sel = Breakout::default_params();
        let window = window_for(&sel, &[]);
        assert!(!sel.matches(&window));
    }
}
