//! Per-strategy aggregation of backtest rows across evaluation dates.
//!
//! Attribution uses the normalized alias list carried on each row, not
//! the '+'-joined display label, so a row matched by several strategies
//! contributes one sample to each of them. Rows whose status carries no
//! usable return data (`no-data`, `insufficient-entry-data`,
//! `awaiting-next-day`) are excluded before any statistic is computed.

use std::collections::{BTreeMap, BTreeSet};

use crate::backtest::ResultRow;

/// Aggregation weights and the horizon the composite score reads.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub win_weight: f64,
    pub ret_weight: f64,
    /// Horizon (days) feeding the composite score.
    pub score_horizon: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            win_weight: 0.6,
            ret_weight: 0.4,
            score_horizon: 5,
        }
    }
}

/// Statistics for one strategy at one holding horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonStat {
    pub days: usize,
    /// Rows with a defined close-entry return at this horizon.
    pub defined: usize,
    /// Mean close-entry return over defined rows; `None` when none.
    pub mean_ret: Option<f64>,
    /// Positive-return rows over ALL sampled rows — an undefined return
    /// never counts as a win.
    pub win_rate: f64,
}

/// One summary row per strategy alias.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySummary {
    pub alias: String,
    pub samples: usize,
    /// Ascending by horizon days.
    pub horizon_stats: Vec<HorizonStat>,
    pub best_horizon: Option<usize>,
    pub best_mean_ret: Option<f64>,
    /// `win_rate% * win_weight + mean_score_horizon_ret * ret_weight`;
    /// ranking-only.
    pub composite: f64,
}

#[derive(Default)]
struct AliasAccumulator {
    samples: usize,
    /// horizon days -> (defined count, sum of returns, win count)
    horizons: BTreeMap<usize, (usize, f64, usize)>,
}

/// Aggregate rows from any number of evaluation dates into one summary
/// per alias, sorted descending by composite score (ties by alias).
pub fn aggregate(rows: &[ResultRow], options: &AggregateOptions) -> Vec<StrategySummary> {
    let mut horizon_days: BTreeSet<usize> = BTreeSet::new();
    let mut accs: BTreeMap<String, AliasAccumulator> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.status.counts_for_stats()) {
        for outcome in &row.horizons {
            horizon_days.insert(outcome.days);
        }
        for alias in &row.strategies {
            let acc = accs.entry(alias.clone()).or_default();
            acc.samples += 1;
            for outcome in &row.horizons {
                let slot = acc.horizons.entry(outcome.days).or_default();
                if let Some(ret) = outcome.ret_close {
                    slot.0 += 1;
                    slot.1 += ret;
                    if ret > 0.0 {
                        slot.2 += 1;
                    }
                }
            }
        }
    }

    let mut summaries: Vec<StrategySummary> = accs
        .into_iter()
        .map(|(alias, acc)| summarize(alias, acc, &horizon_days, options))
        .collect();

    summaries.sort_by(|a, b| {
        b.composite
            .partial_cmp(&a.composite)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.alias.cmp(&b.alias))
    });
    summaries
}

fn summarize(
    alias: String,
    acc: AliasAccumulator,
    horizon_days: &BTreeSet<usize>,
    options: &AggregateOptions,
) -> StrategySummary {
    let mut horizon_stats = Vec::with_capacity(horizon_days.len());
    let mut best: Option<(usize, f64)> = None;

    // Ascending scan; a strictly greater mean replaces, so the shortest
    // horizon wins ties.
    for &days in horizon_days {
        let (defined, sum, wins) = acc.horizons.get(&days).copied().unwrap_or_default();
        let mean_ret = (defined > 0).then(|| sum / defined as f64);
        let win_rate = if acc.samples > 0 {
            wins as f64 / acc.samples as f64
        } else {
            0.0
        };
        if let Some(mean) = mean_ret {
            if best.map_or(true, |(_, b)| mean > b) {
                best = Some((days, mean));
            }
        }
        horizon_stats.push(HorizonStat {
            days,
            defined,
            mean_ret,
            win_rate,
        });
    }

    let score_stat = horizon_stats
        .iter()
        .find(|s| s.days == options.score_horizon);
    let win_pct = score_stat.map_or(0.0, |s| s.win_rate * 100.0);
    let mean_score = score_stat.and_then(|s| s.mean_ret).unwrap_or(0.0);
    let composite = win_pct * options.win_weight + mean_score * options.ret_weight;

    StrategySummary {
        alias,
        samples: acc.samples,
        horizon_stats,
        best_horizon: best.map(|(d, _)| d),
        best_mean_ret: best.map(|(_, m)| m),
        composite,
    }
}
