//! Volume spike rule — unusually heavy turnover on an up day.
//!
//! Matches when the latest bar's volume is at least `multiplier` times
//! the trailing volume average (taken at the previous position, so the
//! spike does not inflate its own baseline) and the day closed up by at
//! least `min_gain_pct` percent.

use crate::domain::EnrichedSeries;
use crate::indicators::{Indicator, VolumeSma};

use super::Selector;

#[derive(Debug, Clone)]
pub struct VolumeSpike {
    period: usize,
    multiplier: f64,
    min_gain_pct: f64,
    vol_key: String,
}

impl VolumeSpike {
    pub fn new(period: usize, multiplier: f64, min_gain_pct: f64) -> Self {
        assert!(period >= 1, "volume period must be >= 1");
        assert!(multiplier > 0.0, "multiplier must be positive");
        Self {
            period,
            multiplier,
            min_gain_pct,
            vol_key: format!("vol_sma_{period}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(20, 2.0, 1.0)
    }
}

impl Selector for VolumeSpike {
    fn name(&self) -> &str {
        "volume_spike"
    }

    fn required_indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(VolumeSma::new(self.period))]
    }

    fn matches(&self, window: &EnrichedSeries) -> bool {
        let n = window.len();
        if n < 2 {
            return false;
        }
        let last = n - 1;

        let baseline = match window.value(&self.vol_key, last - 1) {
            Some(v) if v > 0.0 => v,
            _ => return false,
        };
        let bar = &window.bars()[last];
        if (bar.volume as f64) < self.multiplier * baseline {
            return false;
        }

        let prev_close = window.bars()[last - 1].close;
        if prev_close <= 0.0 {
            return false;
        }
        let gain_pct = (bar.close - prev_close) / prev_close * 100.0;
        gain_pct >= self.min_gain_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::test_support::{bars_from_closes, enrich_for};

    fn spike_bars(volumes: &[u64], closes: &[f64]) -> Vec<crate::domain::Bar> {
        let mut bars = bars_from_closes(closes);
        for (bar, &v) in bars.iter_mut().zip(volumes) {
            bar.volume = v;
        }
        bars
    }

    #[test]
    fn heavy_up_day_matches() {
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 10.5];
        let volumes = [1000, 1000, 1000, 1000, 1000, 5000];
        let sel = VolumeSpike::new(5, 2.0, 1.0);
        let window = enrich_for(&sel, spike_bars(&volumes, &closes));
        assert!(sel.matches(&window));
    }

    #[test]
    fn heavy_down_day_does_not_match() {
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 9.5];
        let volumes = [1000, 1000, 1000, 1000, 1000, 5000];
        let sel = VolumeSpike::new(5, 2.0, 1.0);
        let window = enrich_for(&sel, spike_bars(&volumes, &closes));
        assert!(!sel.matches(&window));
    }

    #[test]
    fn quiet_up_day_does_not_match() {
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 10.5];
        let volumes = [1000, 1000, 1000, 1000, 1000, 1200];
        let sel = VolumeSpike::new(5, 2.0, 1.0);
        let window = enrich_for(&sel, spike_bars(&volumes, &closes));
        assert!(!sel.matches(&window));
    }

    #[test]
    fn undefined_baseline_is_no_match() {
        // Not enough bars to compute the trailing volume average.
        let closes = [10.0, 10.5];
        let volumes = [1000, 9000];
        let sel = VolumeSpike::new(5, 2.0, 1.0);
        let window = enrich_for(&sel, spike_bars(&volumes, &closes));
        assert!(!sel.matches(&window));
    }
}
