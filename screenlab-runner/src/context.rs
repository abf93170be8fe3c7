//! Run context — shared counters updated by scan and backtest workers.
//!
//! Workers increment from inside the rayon fan-out, so the counters are
//! atomics with relaxed ordering; nothing downstream orders on them.
//! `summary()` snapshots the counts into a plain struct for reporting.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared progress counters for one engine run.
#[derive(Debug, Default)]
pub struct RunContext {
    processed: AtomicUsize,
    matched: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

/// Point-in-time snapshot of a `RunContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Instruments a worker picked up.
    pub processed: usize,
    /// Instruments that matched at least one strategy (scan) or produced
    /// an evaluated row (backtest).
    pub matched: usize,
    /// Instruments skipped for lack of usable history.
    pub skipped: usize,
    /// Instruments whose worker task failed or panicked.
    pub failed: usize,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            processed: self.processed.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Human-readable message from a caught panic payload, for the
/// per-instrument diagnostic line a worker emits before counting the
/// failure.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed {}, matched {}, skipped {}, failed {}",
            self.processed, self.matched, self.skipped, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let ctx = RunContext::new();
        ctx.record_processed();
        ctx.record_processed();
        ctx.record_matched();
        ctx.record_skipped();
        let s = ctx.summary();
        assert_eq!(s.processed, 2);
        assert_eq!(s.matched, 1);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.failed, 0);
    }

    #[test]
    fn panic_payloads_render_as_text() {
        let s: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");
        let s: Box<dyn std::any::Any + Send> = Box::new("boom".to_string());
        assert_eq!(panic_message(s.as_ref()), "boom");
        let s: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(s.as_ref()), "unknown panic");
    }

    #[test]
    fn summary_formats_for_logs() {
        let ctx = RunContext::new();
        ctx.record_processed();
        assert_eq!(
            ctx.summary().to_string(),
            "processed 1, matched 0, skipped 0, failed 0"
        );
    }
}
