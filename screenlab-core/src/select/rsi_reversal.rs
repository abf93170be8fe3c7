//! RSI reversal rule — oversold dip followed by an up close.
//!
//! Matches when RSI dropped below `oversold` at some position within the
//! last `confirm_days` bars of the window and the latest bar closed
//! higher than the previous one (the bounce has started).

use crate::domain::EnrichedSeries;
use crate::indicators::{Indicator, Rsi};

use super::Selector;

#[derive(Debug, Clone)]
pub struct RsiReversal {
    period: usize,
    oversold: f64,
    confirm_days: usize,
    rsi_key: String,
}

impl RsiReversal {
    pub fn new(period: usize, oversold: f64, confirm_days: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        assert!(confirm_days >= 1, "confirm_days must be >= 1");
        Self {
            period,
            oversold,
            confirm_days,
            rsi_key: format!("rsi_{period}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(14, 30.0, 3)
    }
}

impl Selector for RsiReversal {
    fn name(&self) -> &str {
        "rsi_reversal"
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(Rsi::new(self.period))]
    }

    fn matches(&self, window: &EnrichedSeries) -> bool {
        let n = window.len();
        if n < 2 {
            return false;
        }
        let last = n - 1;

        // Bounce: latest close up versus the previous bar.
        let bars = window.bars();
        if bars[last].close <= bars[last - 1].close {
            return false;
        }

        // Oversold dip within the confirmation window. Undefined RSI at
        // any inspected position means insufficient history for this rule.
        let earliest = last.saturating_sub(self.confirm_days - 1);
        for i in earliest..=last {
            match window.value(&self.rsi_key, i) {
                Some(rsi) if rsi < self.oversold => return true,
                Some(_) => {}
                None => return false,
            }
        }
        false
    }
}
