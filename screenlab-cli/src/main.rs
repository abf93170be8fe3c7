//! Screenlab CLI — scan, backtest, report, and batch commands.
//!
//! Commands:
//! - `scan` — screen the instrument universe on one date, write the dated match table
//! - `backtest` — evaluate forward returns for a persisted match table
//! - `report` — aggregate persisted result tables into the strategy ranking
//! - `batch` — scan + backtest every trading day of a month, then report

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};

use screenlab_core::config::load_strategies;
use screenlab_runner::{
    aggregate, export_summary_csv, import_matches_csv, load_results_dir, run_backtest, run_scan,
    save_matches, save_results, scan_codes, AggregateOptions, BacktestOptions, BarStore,
    CsvBarStore, NameTable, ResultRow, RunContext, ScanMatch, ScanOptions, StrategySummary,
    DEFAULT_HISTORY_CAP, HOLD_HORIZONS,
};

#[derive(Parser)]
#[command(
    name = "screenlab",
    about = "Screenlab CLI — cross-sectional stock screening and forward-return backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen the universe against the configured strategies on one date.
    Scan {
        /// Directory of per-instrument bar CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Strategy configuration JSON.
        #[arg(long)]
        config: PathBuf,

        /// Evaluation date (YYYY-MM-DD). Defaults to the latest bar date
        /// across the universe.
        #[arg(long)]
        date: Option<String>,

        /// Comma-separated instrument codes, or "all".
        #[arg(long, default_value = "all")]
        tickers: String,

        /// Code-to-name reference CSV. Defaults to stocklist.csv inside
        /// the data directory; missing file degrades to "unknown" names.
        #[arg(long)]
        names: Option<PathBuf>,

        /// History window cap, in bars.
        #[arg(long, default_value_t = DEFAULT_HISTORY_CAP)]
        cap: usize,

        /// Worker threads. Defaults to available CPU parallelism.
        #[arg(long)]
        threads: Option<usize>,

        /// Output directory for the dated match table.
        #[arg(long, default_value = "logs")]
        out_dir: PathBuf,
    },
    /// Evaluate forward returns for a persisted match table.
    Backtest {
        /// Match table CSV produced by `scan`.
        #[arg(long)]
        matches: PathBuf,

        /// Directory of per-instrument bar CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Evaluation date (YYYY-MM-DD). Defaults to the date embedded in
        /// the match table filename (matches_YYYY-MM-DD.csv).
        #[arg(long)]
        date: Option<String>,

        /// Worker threads. Defaults to available CPU parallelism.
        #[arg(long)]
        threads: Option<usize>,

        /// Output directory for the dated result table.
        #[arg(long, default_value = "results")]
        out_dir: PathBuf,
    },
    /// Aggregate persisted result tables into the strategy ranking.
    Report {
        /// Directory holding results_*.csv files.
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,

        /// Write the summary table here as well as printing it.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Scan and backtest every trading day of a month, then report.
    Batch {
        /// Month to process, YYYY-MM.
        #[arg(long)]
        month: String,

        /// Directory of per-instrument bar CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Strategy configuration JSON.
        #[arg(long)]
        config: PathBuf,

        /// Instrument whose bar dates define the month's trading days.
        #[arg(long, default_value = "000001")]
        reference: String,

        /// Worker threads. Defaults to available CPU parallelism.
        #[arg(long)]
        threads: Option<usize>,

        /// Output directory for match tables, result tables, and the
        /// final summary.
        #[arg(long, default_value = "results")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            data_dir,
            config,
            date,
            tickers,
            names,
            cap,
            threads,
            out_dir,
        } => run_scan_cmd(data_dir, config, date, tickers, names, cap, threads, out_dir),
        Commands::Backtest {
            matches,
            data_dir,
            date,
            threads,
            out_dir,
        } => run_backtest_cmd(matches, data_dir, date, threads, out_dir),
        Commands::Report { results_dir, out } => run_report_cmd(&results_dir, out.as_deref()),
        Commands::Batch {
            month,
            data_dir,
            config,
            reference,
            threads,
            out_dir,
        } => run_batch_cmd(data_dir, config, &month, &reference, threads, out_dir),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

/// Latest bar date over the whole universe — the default evaluation
/// date for an end-of-day scan.
fn latest_bar_date(store: &CsvBarStore) -> Result<NaiveDate> {
    let mut latest = None;
    for code in store.universe()? {
        if let Ok(bars) = store.history(&code) {
            if let Some(bar) = bars.last() {
                latest = latest.max(Some(bar.date));
            }
        }
    }
    latest.context("no instrument in the data directory has any bars")
}

#[allow(clippy::too_many_arguments)]
fn run_scan_cmd(
    data_dir: PathBuf,
    config: PathBuf,
    date: Option<String>,
    tickers: String,
    names: Option<PathBuf>,
    cap: usize,
    threads: Option<usize>,
    out_dir: PathBuf,
) -> Result<()> {
    let strategies = load_strategies(&config)?;
    let store = CsvBarStore::new(&data_dir);
    let names = NameTable::load(&names.unwrap_or_else(|| data_dir.join("stocklist.csv")));

    let date = match date {
        Some(s) => parse_date(&s)?,
        None => latest_bar_date(&store)?,
    };
    let options = ScanOptions {
        date: Some(date),
        history_cap: cap,
        threads,
    };

    let ctx = RunContext::new();
    let matches = if tickers == "all" {
        run_scan(&store, &names, &strategies, &options, &ctx)?
    } else {
        let codes: Vec<String> = tickers.split(',').map(|s| s.trim().to_string()).collect();
        scan_codes(&store, &names, &strategies, &codes, &options, &ctx)?
    };

    println!("scan {date}: {}", ctx.summary());
    for (alias, count) in per_alias_counts(&matches) {
        println!("  {alias}: {count} match(es)");
    }

    let path = save_matches(&matches, date, &out_dir)?;
    println!("match table written to {}", path.display());
    Ok(())
}

fn per_alias_counts(matches: &[ScanMatch]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for m in matches {
        for alias in &m.strategies {
            *counts.entry(alias.as_str()).or_default() += 1;
        }
    }
    counts
}

/// Pull the evaluation date out of a `matches_YYYY-MM-DD.csv` filename.
fn date_from_match_filename(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    parse_date(stem.strip_prefix("matches_")?).ok()
}

fn run_backtest_cmd(
    matches_path: PathBuf,
    data_dir: PathBuf,
    date: Option<String>,
    threads: Option<usize>,
    out_dir: PathBuf,
) -> Result<()> {
    let date = match date {
        Some(s) => parse_date(&s)?,
        None => date_from_match_filename(&matches_path).with_context(|| {
            format!(
                "cannot infer evaluation date from '{}'; pass --date",
                matches_path.display()
            )
        })?,
    };

    let text = std::fs::read_to_string(&matches_path)
        .with_context(|| format!("failed to read {}", matches_path.display()))?;
    let matches = import_matches_csv(&text)?;
    if matches.is_empty() {
        bail!("match table {} has no rows", matches_path.display());
    }

    let store = CsvBarStore::new(&data_dir);
    let options = BacktestOptions {
        threads,
        ..BacktestOptions::default()
    };
    let ctx = RunContext::new();
    let rows = run_backtest(&store, &matches, date, &options, &ctx)?;

    println!("backtest {date}: {}", ctx.summary());
    for (status, count) in status_tally(&rows) {
        println!("  {status}: {count}");
    }

    let path = save_results(&rows, &options.horizons, date, &out_dir)?;
    println!("result table written to {}", path.display());
    Ok(())
}

fn status_tally(rows: &[ResultRow]) -> BTreeMap<String, usize> {
    let mut tally = BTreeMap::new();
    for row in rows {
        *tally.entry(row.status.as_label()).or_default() += 1;
    }
    tally
}

fn run_report_cmd(results_dir: &Path, out: Option<&Path>) -> Result<()> {
    let rows = load_results_dir(results_dir)?;
    if rows.is_empty() {
        bail!("no result tables under {}", results_dir.display());
    }
    let summaries = aggregate(&rows, &AggregateOptions::default());
    print_ranking(&summaries);

    if let Some(path) = out {
        std::fs::write(path, export_summary_csv(&summaries)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("summary table written to {}", path.display());
    }
    Ok(())
}

fn print_ranking(summaries: &[StrategySummary]) {
    println!(
        "{:<20} {:>8} {:>8} {:>10} {:>10}",
        "strategy", "samples", "best", "best mean", "composite"
    );
    for s in summaries {
        println!(
            "{:<20} {:>8} {:>8} {:>10} {:>10.2}",
            s.alias,
            s.samples,
            s.best_horizon
                .map(|h| format!("{h}d"))
                .unwrap_or_else(|| "-".to_string()),
            s.best_mean_ret
                .map(|m| format!("{m:.2}"))
                .unwrap_or_else(|| "-".to_string()),
            s.composite,
        );
    }
}

/// Trading days of a month, read off a reference instrument's series.
fn trading_days(store: &CsvBarStore, reference: &str, year: i32, month: u32) -> Result<Vec<NaiveDate>> {
    let bars = store.history(reference)?;
    if bars.is_empty() {
        bail!("reference instrument '{reference}' has no bars");
    }
    Ok(bars
        .iter()
        .map(|b| b.date)
        .filter(|d| d.year() == year && d.month() == month)
        .collect())
}

fn run_batch_cmd(
    data_dir: PathBuf,
    config: PathBuf,
    month: &str,
    reference: &str,
    threads: Option<usize>,
    out_dir: PathBuf,
) -> Result<()> {
    let (year, month_num) = month
        .split_once('-')
        .and_then(|(y, m)| Some((y.parse().ok()?, m.parse().ok()?)))
        .with_context(|| format!("invalid month '{month}' (expected YYYY-MM)"))?;

    let strategies = load_strategies(&config)?;
    let store = CsvBarStore::new(&data_dir);
    let names = NameTable::load(&data_dir.join("stocklist.csv"));
    let days = trading_days(&store, reference, year, month_num)?;
    if days.is_empty() {
        bail!("reference instrument '{reference}' has no bars in {month}");
    }
    println!("{month}: {} trading day(s)", days.len());

    let backtest_options = BacktestOptions {
        threads,
        ..BacktestOptions::default()
    };
    for date in days {
        let scan_options = ScanOptions {
            date: Some(date),
            history_cap: DEFAULT_HISTORY_CAP,
            threads,
        };
        let ctx = RunContext::new();
        let matches = run_scan(&store, &names, &strategies, &scan_options, &ctx)?;
        if matches.is_empty() {
            println!("{date}: no matches ({})", ctx.summary());
            continue;
        }
        save_matches(&matches, date, &out_dir)?;

        let ctx = RunContext::new();
        let rows = run_backtest(&store, &matches, date, &backtest_options, &ctx)?;
        save_results(&rows, &HOLD_HORIZONS, date, &out_dir)?;
        println!("{date}: {} match(es), {}", matches.len(), ctx.summary());
    }

    run_report_cmd(&out_dir, Some(&out_dir.join("summary.csv")))
}
