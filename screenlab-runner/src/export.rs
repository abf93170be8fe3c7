//! Export and import of persisted engine outputs.
//!
//! Three CSV tables per the persistence contract: the dated match table
//! (`code,name,strategies`), the dated backtest result table (one
//! close-return and one open-return column per horizon, plus the legacy
//! 5-day `ret_close`/`ret_open` pair for single-horizon consumers), and
//! the strategy summary table. Result tables can be read back so
//! reporting can aggregate across previously persisted dates.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use crate::aggregate::StrategySummary;
use crate::backtest::{HorizonOutcome, ResultRow, RowStatus};
use crate::scan::ScanMatch;

/// Legacy single-horizon pair retained at the end of the result table.
pub const LEGACY_HORIZON: usize = 5;

fn opt2(x: Option<f64>) -> String {
    x.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn parse_opt(field: &str) -> Option<f64> {
    if field.is_empty() {
        None
    } else {
        field.parse().ok()
    }
}

// ─── Match table ────────────────────────────────────────────────────

/// Serialize the dated match table.
pub fn export_matches_csv(matches: &[ScanMatch]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["code", "name", "strategies"])?;
    for m in matches {
        wtr.write_record([&m.code, &m.name, &m.label()])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Read a match table back.
pub fn import_matches_csv(text: &str) -> Result<Vec<ScanMatch>> {
    let mut rdr = csv::Reader::from_reader(text.as_bytes());
    let mut matches = Vec::new();
    for record in rdr.records() {
        let record = record.context("malformed match table row")?;
        let (Some(code), Some(name), Some(label)) =
            (record.get(0), record.get(1), record.get(2))
        else {
            bail!("match table row has fewer than 3 columns");
        };
        matches.push(ScanMatch {
            code: code.to_string(),
            name: name.to_string(),
            strategies: label.split('+').map(str::to_string).collect(),
        });
    }
    Ok(matches)
}

// ─── Result table ───────────────────────────────────────────────────

fn result_header(horizons: &[usize]) -> Vec<String> {
    let mut header = vec![
        "code".to_string(),
        "name".to_string(),
        "strategies".to_string(),
        "date".to_string(),
        "buy_close".to_string(),
        "next_open".to_string(),
        "status".to_string(),
    ];
    for &h in horizons {
        header.push(format!("close_ret_{h}d"));
        header.push(format!("open_ret_{h}d"));
    }
    // Legacy pair for consumers that predate multi-horizon output.
    header.push("ret_close".to_string());
    header.push("ret_open".to_string());
    header
}

/// Serialize the dated result table.
pub fn export_results_csv(rows: &[ResultRow], horizons: &[usize]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(result_header(horizons))?;

    for row in rows {
        let mut record = vec![
            row.code.clone(),
            row.name.clone(),
            row.label(),
            row.date.to_string(),
            opt2(row.buy_close),
            opt2(row.next_open),
            row.status.as_label(),
        ];
        for &h in horizons {
            let outcome = row.horizons.iter().find(|o| o.days == h);
            record.push(opt2(outcome.and_then(|o| o.ret_close)));
            record.push(opt2(outcome.and_then(|o| o.ret_open)));
        }
        let legacy = row.horizons.iter().find(|o| o.days == LEGACY_HORIZON);
        record.push(opt2(legacy.and_then(|o| o.ret_close)));
        record.push(opt2(legacy.and_then(|o| o.ret_open)));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Read a result table back.
///
/// The horizon set is reconstructed from the `close_ret_{h}d` header
/// columns, so tables persisted with a non-default set still load.
/// Exit prices and actual hold lengths are not persisted; imported
/// rows carry returns and status, which is all aggregation reads.
pub fn import_results_csv(text: &str) -> Result<Vec<ResultRow>> {
    let mut rdr = csv::Reader::from_reader(text.as_bytes());
    let headers = rdr.headers().context("result table has no header")?.clone();

    // (days, close column index, open column index)
    let mut horizon_cols: Vec<(usize, usize, usize)> = Vec::new();
    for (i, field) in headers.iter().enumerate() {
        if let Some(days) = field
            .strip_prefix("close_ret_")
            .and_then(|rest| rest.strip_suffix('d'))
            .and_then(|d| d.parse::<usize>().ok())
        {
            horizon_cols.push((days, i, i + 1));
        }
    }
    if horizon_cols.is_empty() {
        bail!("result table header has no close_ret_{{h}}d columns");
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.context("malformed result table row")?;
        let field = |i: usize| record.get(i).unwrap_or("");

        let date: NaiveDate = field(3)
            .parse()
            .with_context(|| format!("bad date '{}' in result table", field(3)))?;
        let status = RowStatus::parse(field(6))
            .with_context(|| format!("unknown status '{}' in result table", field(6)))?;

        let horizons = horizon_cols
            .iter()
            .map(|&(days, close_col, open_col)| HorizonOutcome {
                days,
                actual_days: days,
                exit_close: None,
                ret_close: parse_opt(field(close_col)),
                ret_open: parse_opt(field(open_col)),
                partial: false,
            })
            .collect();

        rows.push(ResultRow {
            code: field(0).to_string(),
            name: field(1).to_string(),
            strategies: field(2).split('+').map(str::to_string).collect(),
            date,
            buy_close: parse_opt(field(4)),
            next_open: parse_opt(field(5)),
            status,
            horizons,
        });
    }
    Ok(rows)
}

// ─── Summary table ──────────────────────────────────────────────────

/// Serialize the per-strategy summary table, in ranking order.
pub fn export_summary_csv(summaries: &[StrategySummary]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let horizons: Vec<usize> = summaries
        .first()
        .map(|s| s.horizon_stats.iter().map(|h| h.days).collect())
        .unwrap_or_default();

    let mut header = vec!["alias".to_string(), "samples".to_string()];
    for &h in &horizons {
        header.push(format!("mean_ret_{h}d"));
        header.push(format!("win_rate_{h}d"));
    }
    header.push("best_horizon".to_string());
    header.push("best_mean_ret".to_string());
    header.push("composite".to_string());
    wtr.write_record(&header)?;

    for s in summaries {
        let mut record = vec![s.alias.clone(), s.samples.to_string()];
        for stat in &s.horizon_stats {
            record.push(opt2(stat.mean_ret));
            record.push(format!("{:.2}", stat.win_rate * 100.0));
        }
        record.push(
            s.best_horizon
                .map(|h| h.to_string())
                .unwrap_or_default(),
        );
        record.push(opt2(s.best_mean_ret));
        record.push(format!("{:.2}", s.composite));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Dated files ────────────────────────────────────────────────────

/// Write the match table for one date as `matches_{date}.csv`.
pub fn save_matches(matches: &[ScanMatch], date: NaiveDate, out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output dir: {}", out_dir.display()))?;
    let path = out_dir.join(format!("matches_{date}.csv"));
    std::fs::write(&path, export_matches_csv(matches)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write the result table for one date as `results_{date}.csv`.
pub fn save_results(
    rows: &[ResultRow],
    horizons: &[usize],
    date: NaiveDate,
    out_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output dir: {}", out_dir.display()))?;
    let path = out_dir.join(format!("results_{date}.csv"));
    std::fs::write(&path, export_results_csv(rows, horizons)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Load and concatenate every `results_*.csv` under a directory, in
/// filename order.
pub fn load_results_dir(dir: &Path) -> Result<Vec<ResultRow>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read results dir: {}", dir.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("results_") && n.ends_with(".csv"))
        })
        .collect();
    paths.sort();

    let mut rows = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        rows.extend(
            import_results_csv(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?,
        );
    }
    Ok(rows)
}
