//! Screenlab Runner — cross-sectional scan, forward-return backtest,
//! aggregation, and persisted tables.
//!
//! This crate builds on `screenlab-core` to provide:
//! - The bar store adapter (per-instrument CSV files) and name table
//! - The parallel screening scheduler with run-scoped progress counters
//! - The multi-horizon forward-return engine with partial-hold clamping
//! - Per-strategy aggregation across evaluation dates
//! - CSV export/import of match, result, and summary tables

pub mod aggregate;
pub mod backtest;
pub mod context;
pub mod export;
pub mod scan;
pub mod store;

pub use aggregate::{aggregate, AggregateOptions, HorizonStat, StrategySummary};
pub use backtest::{
    evaluate_forward, run_backtest, BacktestError, BacktestOptions, ForwardReturns,
    HorizonOutcome, ResultRow, RowStatus, HOLD_HORIZONS,
};
pub use context::{RunContext, RunSummary};
pub use export::{
    export_matches_csv, export_results_csv, export_summary_csv, import_matches_csv,
    import_results_csv, load_results_dir, save_matches, save_results, LEGACY_HORIZON,
};
pub use scan::{run_scan, scan_codes, ScanError, ScanMatch, ScanOptions, DEFAULT_HISTORY_CAP};
pub use store::{BarStore, CsvBarStore, MemoryStore, NameTable, StoreError, UNKNOWN_NAME};
