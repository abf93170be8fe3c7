//! Cross-sectional scan — fan the active strategies out across the
//! instrument universe.
//!
//! Per instrument the pipeline is: load full history, precompute the
//! union of required indicators once, truncate to the scan date, cap to
//! the most recent `history_cap` bars, then evaluate every strategy on
//! that one shared window. Workers run under rayon; the fan-in collect
//! preserves universe order, so results are deterministic for any
//! thread count.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::NaiveDate;
use rayon::prelude::*;
use screenlab_core::config::ActiveStrategy;
use screenlab_core::indicators::{dedup_indicators, enrich, Indicator};

use crate::context::{panic_message, RunContext};
use crate::store::{BarStore, NameTable, StoreError};

/// Most recent bars kept in the evaluation window.
pub const DEFAULT_HISTORY_CAP: usize = 400;

/// Options for one scan run.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Evaluate as of this date; `None` means the latest bar each
    /// instrument has.
    pub date: Option<NaiveDate>,
    /// Window cap applied after date truncation.
    pub history_cap: usize,
    /// Worker thread count; `None` lets rayon pick.
    pub threads: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            date: None,
            history_cap: DEFAULT_HISTORY_CAP,
            threads: None,
        }
    }
}

/// One instrument that matched at least one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMatch {
    pub code: String,
    pub name: String,
    /// Matched strategy aliases in configuration order.
    pub strategies: Vec<String>,
}

impl ScanMatch {
    /// Denormalized display label, e.g. `breakout+volume_spike`.
    pub fn label(&self) -> String {
        self.strategies.join("+")
    }
}

/// Errors that abort a scan before or during fan-out.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

enum InstrumentOutcome {
    Matched(ScanMatch),
    NoMatch,
    Skipped,
    Failed,
}

/// Scan the whole universe with the given strategies.
///
/// Per-instrument failures (unreadable file, panicking selector) are
/// counted in the context and excluded from the result; they never
/// abort the run.
pub fn run_scan(
    store: &dyn BarStore,
    names: &NameTable,
    strategies: &[ActiveStrategy],
    options: &ScanOptions,
    ctx: &RunContext,
) -> Result<Vec<ScanMatch>, ScanError> {
    let universe = store.universe()?;
    scan_codes(store, names, strategies, &universe, options, ctx)
}

/// Scan an explicit code list (subset runs, tests).
pub fn scan_codes(
    store: &dyn BarStore,
    names: &NameTable,
    strategies: &[ActiveStrategy],
    codes: &[String],
    options: &ScanOptions,
    ctx: &RunContext,
) -> Result<Vec<ScanMatch>, ScanError> {
    let indicators = required_indicators(strategies);

    let evaluate = |code: &String| -> InstrumentOutcome {
        ctx.record_processed();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            evaluate_instrument(store, names, strategies, &indicators, code, options)
        }));
        match outcome {
            Ok(result) => result,
            Err(payload) => {
                eprintln!(
                    "scan: instrument {code} failed: {}",
                    panic_message(payload.as_ref())
                );
                InstrumentOutcome::Failed
            }
        }
    };

    let outcomes: Vec<InstrumentOutcome> = match options.threads {
        Some(n) if n > 1 => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            pool.install(|| codes.par_iter().map(evaluate).collect())
        }
        Some(_) => codes.iter().map(evaluate).collect(),
        None => codes.par_iter().map(evaluate).collect(),
    };

    let mut matches = Vec::new();
    for outcome in outcomes {
        match outcome {
            InstrumentOutcome::Matched(m) => {
                ctx.record_matched();
                matches.push(m);
            }
            InstrumentOutcome::NoMatch => {}
            InstrumentOutcome::Skipped => ctx.record_skipped(),
            InstrumentOutcome::Failed => ctx.record_failed(),
        }
    }
    Ok(matches)
}

/// Union of every strategy's indicator requirements, deduplicated by
/// output name so shared indicators are computed once per instrument.
fn required_indicators(strategies: &[ActiveStrategy]) -> Vec<Box<dyn Indicator>> {
    let all: Vec<Box<dyn Indicator>> = strategies
        .iter()
        .flat_map(|s| s.selector.required_indicators())
        .collect();
    dedup_indicators(all)
}

fn evaluate_instrument(
    store: &dyn BarStore,
    names: &NameTable,
    strategies: &[ActiveStrategy],
    indicators: &[Box<dyn Indicator>],
    code: &str,
    options: &ScanOptions,
) -> InstrumentOutcome {
    let bars = match store.history(code) {
        Ok(bars) => bars,
        Err(err) => {
            eprintln!("scan: cannot load history for {code}: {err}");
            return InstrumentOutcome::Failed;
        }
    };
    if bars.is_empty() {
        return InstrumentOutcome::Skipped;
    }

    // Indicators see the full history; the window cut happens after, so
    // long-lookback values near the window start stay defined.
    let enriched = enrich(bars, indicators);
    let window = match options.date {
        Some(date) => enriched.truncate_to(date).tail(options.history_cap),
        None => enriched.tail(options.history_cap),
    };
    if window.is_empty() {
        return InstrumentOutcome::Skipped;
    }

    let matched: Vec<String> = strategies
        .iter()
        .filter(|s| s.selector.matches(&window))
        .map(|s| s.alias.clone())
        .collect();

    if matched.is_empty() {
        InstrumentOutcome::NoMatch
    } else {
        InstrumentOutcome::Matched(ScanMatch {
            code: code.to_string(),
            name: names.lookup(code).to_string(),
            strategies: matched,
        })
    }
}
