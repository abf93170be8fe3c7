//! Bar — one trading day for one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar at trading-day granularity.
///
/// A series for one instrument is strictly ascending by date with no
/// synthetic gap filling: non-trading days simply have no bar. The
/// instrument code lives one level up (the store maps code → series),
/// so the bar itself carries no symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Basic OHLC sanity check: high is the ceiling, low the floor,
    /// and prices are positive.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Returns true if `bars` is strictly ascending by date with no duplicates.
pub fn dates_strictly_ascending(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].date < w[1].date)
}
