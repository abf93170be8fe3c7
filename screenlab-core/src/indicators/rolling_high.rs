//! Trailing high — the maximum high over the previous `period` bars,
//! excluding the current bar.
//!
//! Used as the breakout reference level: comparing today's close against
//! a window that included today would make every new high a trivial
//! self-comparison. Lookback: period (first defined value at index
//! period, once a full prior window exists).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct RollingHigh {
    period: usize,
    name: String,
}

impl RollingHigh {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "rolling high period must be >= 1");
        Self {
            period,
            name: format!("roll_high_{period}"),
        }
    }
}

impl Indicator for RollingHigh {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let window = &bars[i - self.period..i];
            result[i] = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        }

        result
    }
}
