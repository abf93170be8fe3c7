//! Relative Strength Index (RSI), Wilder smoothing.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss). Lookback: period.
//! Edge cases: no losses → 100, no gains → 0, flat series → 50.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }

    fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            if avg_gain == 0.0 {
                50.0
            } else {
                100.0
            }
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period + 1 {
            return result;
        }

        // Seed: simple averages over the first `period` changes.
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for i in 1..=self.period {
            let ch = bars[i].close - bars[i - 1].close;
            if ch > 0.0 {
                avg_gain += ch;
            } else {
                avg_loss -= ch;
            }
        }
        avg_gain /= self.period as f64;
        avg_loss /= self.period as f64;
        result[self.period] = Self::rsi_from(avg_gain, avg_loss);

        // Wilder smoothing for the rest.
        let p = self.period as f64;
        for i in (self.period + 1)..n {
            let ch = bars[i].close - bars[i - 1].close;
            let (gain, loss) = if ch > 0.0 { (ch, 0.0) } else { (0.0, -ch) };
            avg_gain = (avg_gain * (p - 1.0) + gain) / p;
            avg_loss = (avg_loss * (p - 1.0) + loss) / p;
            result[i] = Self::rsi_from(avg_gain, avg_loss);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains_is_100() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let result = Rsi::new(4).compute(&bars);
        assert!(result[3].is_nan());
        assert_approx(result[4], 100.0, 1e-9);
        assert_approx(result[5], 100.0, 1e-9);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let bars = make_bars(&[15.0, 14.0, 13.0, 12.0, 11.0, 10.0]);
        let result = Rsi::new(4).compute(&bars);
        assert_approx(result[4], 0.0, 1e-9);
    }

    #[test]
    fn rsi_flat_series_is_50() {
        let bars = make_bars(&[10.0; 6]);
        let result = Rsi::new(4).compute(&bars);
        assert_approx(result[4], 50.0, 1e-9);
    }

    #[test]
    fn rsi_balanced_moves_near_50() {
        // Alternating +1/-1 changes: equal average gain and loss → RSI 50.
        let bars = make_bars(&[10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0]);
        let result = Rsi::new(4).compute(&bars);
        assert!(result[4] > 30.0 && result[4] < 70.0);
    }

    #[test]
    fn rsi_warmup_is_undefined() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let result = Rsi::new(4).compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
