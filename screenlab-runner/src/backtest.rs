//! Multi-horizon forward-return engine.
//!
//! For every matched instrument on an evaluation date: enter at that
//! day's close (and, as a second convention, the next day's open), then
//! measure the close-to-exit return after holding 1, 2, 3, 5, and 10
//! trading days. A horizon that runs past the end of recorded history
//! clamps to the last bar and is flagged partial instead of being
//! dropped, so matches near the data frontier still report what has
//! accrued so far.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::context::{panic_message, RunContext};
use crate::scan::ScanMatch;
use crate::store::BarStore;

/// Default holding horizons, in trading days.
pub const HOLD_HORIZONS: [usize; 5] = [1, 2, 3, 5, 10];

/// Options for one backtest run.
#[derive(Debug, Clone)]
pub struct BacktestOptions {
    pub horizons: Vec<usize>,
    /// Worker thread count; `None` lets rayon pick.
    pub threads: Option<usize>,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            horizons: HOLD_HORIZONS.to_vec(),
            threads: None,
        }
    }
}

/// Per-row evaluation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Ok,
    /// No stored history at all for the instrument.
    NoData,
    /// The series exists but has no bar at the evaluation date.
    InsufficientEntryData,
    /// The evaluation date is the last recorded bar; the next-day open
    /// does not exist yet.
    AwaitingNextDay,
    /// The largest configured horizon ran past recorded history.
    PartialHold { days_held: usize },
}

impl RowStatus {
    /// Stable string form used in persisted result tables.
    pub fn as_label(&self) -> String {
        match self {
            RowStatus::Ok => "ok".to_string(),
            RowStatus::NoData => "no-data".to_string(),
            RowStatus::InsufficientEntryData => "insufficient-entry-data".to_string(),
            RowStatus::AwaitingNextDay => "awaiting-next-day".to_string(),
            RowStatus::PartialHold { days_held } => format!("partial-hold ({days_held})"),
        }
    }

    /// Inverse of `as_label`, for reading persisted tables back.
    pub fn parse(label: &str) -> Option<RowStatus> {
        match label {
            "ok" => Some(RowStatus::Ok),
            "no-data" => Some(RowStatus::NoData),
            "insufficient-entry-data" => Some(RowStatus::InsufficientEntryData),
            "awaiting-next-day" => Some(RowStatus::AwaitingNextDay),
            other => {
                let days = other
                    .strip_prefix("partial-hold (")?
                    .strip_suffix(')')?
                    .parse()
                    .ok()?;
                Some(RowStatus::PartialHold { days_held: days })
            }
        }
    }

    /// Whether the row carries usable return data for aggregation.
    pub fn counts_for_stats(&self) -> bool {
        matches!(self, RowStatus::Ok | RowStatus::PartialHold { .. })
    }
}

/// Forward outcome at one holding horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonOutcome {
    /// Requested holding days.
    pub days: usize,
    /// Days actually held (smaller than `days` when clamped).
    pub actual_days: usize,
    pub exit_close: Option<f64>,
    /// Close-entry return, percent, 2 decimals.
    pub ret_close: Option<f64>,
    /// Next-open-entry return, percent, 2 decimals.
    pub ret_open: Option<f64>,
    /// Exit was clamped to the last available bar.
    pub partial: bool,
}

impl HorizonOutcome {
    fn undefined(days: usize) -> Self {
        Self {
            days,
            actual_days: 0,
            exit_close: None,
            ret_close: None,
            ret_open: None,
            partial: false,
        }
    }
}

/// One evaluated (instrument, date) row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub code: String,
    pub name: String,
    /// Matched strategy aliases, normalized (one entry per alias).
    pub strategies: Vec<String>,
    pub date: NaiveDate,
    pub buy_close: Option<f64>,
    pub next_open: Option<f64>,
    pub status: RowStatus,
    pub horizons: Vec<HorizonOutcome>,
}

impl ResultRow {
    /// Denormalized display label, e.g. `breakout+volume_spike`.
    pub fn label(&self) -> String {
        self.strategies.join("+")
    }
}

/// Outcome of the shared entry-plus-horizons computation, before the
/// instrument identity is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardReturns {
    pub buy_close: Option<f64>,
    pub next_open: Option<f64>,
    pub status: RowStatus,
    pub horizons: Vec<HorizonOutcome>,
}

/// Errors that abort a backtest run before fan-out.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Round half away from zero to 2 decimals, matching the persisted
/// percent format.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn pct_return(reference: f64, exit: f64) -> Option<f64> {
    if reference > 0.0 {
        Some(round2((exit - reference) / reference * 100.0))
    } else {
        None
    }
}

/// Compute entry prices and all horizon outcomes for one instrument.
///
/// `bars` is the instrument's full ascending-date series. The position
/// is held from the day after the evaluation date, so holding `h` days
/// exits at the close of bar `entry_index + h`.
pub fn evaluate_forward(
    bars: &[screenlab_core::domain::Bar],
    date: NaiveDate,
    horizons: &[usize],
) -> ForwardReturns {
    let undefined = |status: RowStatus| ForwardReturns {
        buy_close: None,
        next_open: None,
        status,
        horizons: horizons.iter().map(|&h| HorizonOutcome::undefined(h)).collect(),
    };

    if bars.is_empty() {
        return undefined(RowStatus::NoData);
    }
    let Ok(entry) = bars.binary_search_by_key(&date, |b| b.date) else {
        return undefined(RowStatus::InsufficientEntryData);
    };

    let buy_close = bars[entry].close;
    if entry + 1 >= bars.len() {
        let mut r = undefined(RowStatus::AwaitingNextDay);
        r.buy_close = Some(buy_close);
        return r;
    }
    let next_open = bars[entry + 1].open;

    let last = bars.len() - 1;
    let largest = horizons.iter().copied().max();
    let mut status = RowStatus::Ok;
    let mut outcomes = Vec::with_capacity(horizons.len());
    for &h in horizons {
        let target = entry + h;
        let partial = target > last;
        let exit = target.min(last);
        let actual_days = exit - entry;
        let exit_close = bars[exit].close;
        if partial && Some(h) == largest {
            status = RowStatus::PartialHold {
                days_held: actual_days,
            };
        }
        outcomes.push(HorizonOutcome {
            days: h,
            actual_days,
            exit_close: Some(exit_close),
            ret_close: pct_return(buy_close, exit_close),
            ret_open: pct_return(next_open, exit_close),
            partial,
        });
    }

    ForwardReturns {
        buy_close: Some(buy_close),
        next_open: Some(next_open),
        status,
        horizons: outcomes,
    }
}

/// Evaluate every matched instrument for one date.
///
/// Per-instrument problems become row statuses, never aborts; a panic
/// inside a worker drops that row and bumps the failed counter.
pub fn run_backtest(
    store: &dyn BarStore,
    matches: &[ScanMatch],
    date: NaiveDate,
    options: &BacktestOptions,
    ctx: &RunContext,
) -> Result<Vec<ResultRow>, BacktestError> {
    let evaluate = |m: &ScanMatch| -> Option<ResultRow> {
        ctx.record_processed();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let bars = match store.history(&m.code) {
                Ok(bars) => bars,
                Err(err) => {
                    // Degrades to a no-data row; still worth naming the file.
                    eprintln!("backtest: cannot load history for {}: {err}", m.code);
                    Vec::new()
                }
            };
            evaluate_forward(&bars, date, &options.horizons)
        }));
        match outcome {
            Ok(fwd) => {
                if fwd.status.counts_for_stats() {
                    ctx.record_matched();
                } else {
                    ctx.record_skipped();
                }
                Some(ResultRow {
                    code: m.code.clone(),
                    name: m.name.clone(),
                    strategies: m.strategies.clone(),
                    date,
                    buy_close: fwd.buy_close,
                    next_open: fwd.next_open,
                    status: fwd.status,
                    horizons: fwd.horizons,
                })
            }
            Err(payload) => {
                eprintln!(
                    "backtest: instrument {} failed: {}",
                    m.code,
                    panic_message(payload.as_ref())
                );
                ctx.record_failed();
                None
            }
        }
    };

    let rows: Vec<Option<ResultRow>> = match options.threads {
        Some(n) if n > 1 => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            pool.install(|| matches.par_iter().map(evaluate).collect())
        }
        Some(_) => matches.iter().map(evaluate).collect(),
        None => matches.par_iter().map(evaluate).collect(),
    };
    Ok(rows.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use screenlab_core::domain::Bar;

    use crate::store::MemoryStore;

    fn day(i: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap() + chrono::Days::new(i)
    }

    /// Bars where each day opens at the previous close (gap-free).
    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Bar {
                    date: day(i as u64),
                    open,
                    high: open.max(close),
                    low: open.min(close),
                    close,
                    volume: 1_000,
                }
            })
            .collect()
    }

    fn outcome(fwd: &ForwardReturns, days: usize) -> &HorizonOutcome {
        fwd.horizons.iter().find(|o| o.days == days).unwrap()
    }

    #[test]
    fn five_day_reference_scenario() {
        // Entry close 10; forward closes 11, 12, 9, 15.
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 9.0, 15.0]);
        let fwd = evaluate_forward(&bars, day(0), &HOLD_HORIZONS);

        assert_eq!(fwd.buy_close, Some(10.0));
        assert_eq!(fwd.next_open, Some(10.0));
        assert_eq!(outcome(&fwd, 1).ret_close, Some(10.0));
        assert_eq!(outcome(&fwd, 2).ret_close, Some(20.0));
        assert_eq!(outcome(&fwd, 3).ret_close, Some(-10.0));

        // Only 4 bars exist after entry: 5 and 10 both clamp to the
        // last close, and the largest horizon sets the row status.
        let h5 = outcome(&fwd, 5);
        assert!(h5.partial);
        assert_eq!(h5.actual_days, 4);
        assert_eq!(h5.ret_close, Some(50.0));
        let h10 = outcome(&fwd, 10);
        assert!(h10.partial);
        assert_eq!(fwd.status, RowStatus::PartialHold { days_held: 4 });
    }

    #[test]
    fn complete_history_is_ok() {
        let closes: Vec<f64> = (0..15).map(|i| 10.0 + i as f64 * 0.1).collect();
        let fwd = evaluate_forward(&bars_from_closes(&closes), day(0), &HOLD_HORIZONS);
        assert_eq!(fwd.status, RowStatus::Ok);
        assert!(fwd.horizons.iter().all(|o| !o.partial));
        assert!(fwd.horizons.iter().all(|o| o.actual_days == o.days));
    }

    #[test]
    fn zero_distance_return_is_zero() {
        let fwd = evaluate_forward(
            &bars_from_closes(&[10.0, 10.0, 10.0]),
            day(0),
            &[1, 2],
        );
        assert_eq!(outcome(&fwd, 1).ret_close, Some(0.0));
        assert_eq!(outcome(&fwd, 2).ret_close, Some(0.0));
    }

    #[test]
    fn returns_round_to_two_decimals() {
        // (3.001 - 3) / 3 * 100 = 0.0333... -> 0.03
        let fwd = evaluate_forward(&bars_from_closes(&[3.0, 3.001]), day(0), &[1]);
        let h1 = outcome(&fwd, 1);
        assert!(!h1.partial);
        assert_eq!(h1.ret_close, Some(0.03));
    }

    #[test]
    fn missing_entry_date_yields_null_row() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0]);
        let fwd = evaluate_forward(&bars, day(30), &HOLD_HORIZONS);
        assert_eq!(fwd.status, RowStatus::InsufficientEntryData);
        assert_eq!(fwd.buy_close, None);
        assert!(fwd.horizons.iter().all(|o| o.ret_close.is_none()));
    }

    #[test]
    fn entry_on_last_bar_awaits_next_day() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0]);
        let fwd = evaluate_forward(&bars, day(2), &HOLD_HORIZONS);
        assert_eq!(fwd.status, RowStatus::AwaitingNextDay);
        assert_eq!(fwd.buy_close, Some(12.0));
        assert_eq!(fwd.next_open, None);
        assert!(fwd.horizons.iter().all(|o| o.ret_close.is_none()));
    }

    #[test]
    fn empty_series_is_no_data() {
        let fwd = evaluate_forward(&[], day(0), &HOLD_HORIZONS);
        assert_eq!(fwd.status, RowStatus::NoData);
        assert_eq!(fwd.buy_close, None);
    }

    #[test]
    fn non_positive_open_gives_null_open_return() {
        let mut bars = bars_from_closes(&[10.0, 11.0, 12.0, 13.0]);
        bars[1].open = 0.0;
        let fwd = evaluate_forward(&bars, day(0), &[1, 2]);
        let h1 = outcome(&fwd, 1);
        assert!(h1.ret_close.is_some());
        assert_eq!(h1.ret_open, None);
    }

    #[test]
    fn status_labels_round_trip() {
        let statuses = [
            RowStatus::Ok,
            RowStatus::NoData,
            RowStatus::InsufficientEntryData,
            RowStatus::AwaitingNextDay,
            RowStatus::PartialHold { days_held: 4 },
        ];
        for s in statuses {
            assert_eq!(RowStatus::parse(&s.as_label()), Some(s));
        }
        assert_eq!(RowStatus::parse("held until moon phase"), None);
    }

    #[test]
    fn run_backtest_attaches_match_identity() {
        let mut store = MemoryStore::new();
        store.insert("000001", bars_from_closes(&[10.0, 11.0, 12.0, 9.0, 15.0]));
        let matches = vec![ScanMatch {
            code: "000001".into(),
            name: "Ping An".into(),
            strategies: vec!["a".into(), "b".into()],
        }];
        let ctx = RunContext::new();
        let rows = run_backtest(
            &store,
            &matches,
            day(0),
            &BacktestOptions::default(),
            &ctx,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "000001");
        assert_eq!(rows[0].label(), "a+b");
        assert_eq!(rows[0].buy_close, Some(10.0));
        assert_eq!(ctx.summary().matched, 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Whatever the series shape, horizon outcomes stay inside
            /// recorded history and the persisted return matches the
            /// rounded close-entry formula.
            #[test]
            fn horizon_outcomes_stay_in_bounds(
                closes in proptest::collection::vec(1.0f64..500.0, 2..40),
                entry in 0usize..40,
            ) {
                let bars = bars_from_closes(&closes);
                prop_assume!(entry < bars.len());
                let fwd = evaluate_forward(&bars, bars[entry].date, &HOLD_HORIZONS);

                if fwd.status == RowStatus::AwaitingNextDay {
                    prop_assert_eq!(entry + 1, bars.len());
                    return Ok(());
                }
                let buy = fwd.buy_close.unwrap();
                for o in &fwd.horizons {
                    prop_assert!(o.actual_days <= o.days);
                    prop_assert_eq!(o.partial, o.actual_days < o.days);
                    let exit = o.exit_close.unwrap();
                    let expected = ((exit - buy) / buy * 10_000.0).round() / 100.0;
                    prop_assert!((o.ret_close.unwrap() - expected).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn unknown_code_row_is_no_data_not_abort() {
        let store = MemoryStore::new();
        let matches = vec![ScanMatch {
            code: "999999".into(),
            name: "unknown".into(),
            strategies: vec!["a".into()],
        }];
        let ctx = RunContext::new();
        let rows = run_backtest(
            &store,
            &matches,
            day(0),
            &BacktestOptions::default(),
            &ctx,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, RowStatus::NoData);
        assert_eq!(ctx.summary().skipped, 1);
    }
}
