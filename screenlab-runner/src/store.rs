//! Bar store adapter — per-instrument history lookup and universe listing.
//!
//! The engine never acquires raw market data itself; it consumes an
//! already-populated store through the `BarStore` trait. The shipped
//! adapter reads one `{code}.csv` per instrument from a directory
//! (header `date,open,high,low,close,volume`), sorts by date, and treats
//! an unknown code as an empty series rather than an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use screenlab_core::domain::Bar;
use serde::Deserialize;

/// Errors from the store layer.
///
/// A missing instrument file is NOT an error (unknown code → empty
/// series); these cover genuinely broken inputs.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot read data directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed bar file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// History lookup and universe listing.
pub trait BarStore: Send + Sync {
    /// Full ascending-date history for a code; empty for unknown codes.
    fn history(&self, code: &str) -> Result<Vec<Bar>, StoreError>;

    /// All instrument codes the store knows about, sorted.
    fn universe(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl From<BarRecord> for Bar {
    fn from(r: BarRecord) -> Self {
        Bar {
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        }
    }
}

/// Directory of per-instrument CSV files.
#[derive(Debug, Clone)]
pub struct CsvBarStore {
    dir: PathBuf,
}

impl CsvBarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{code}.csv"))
    }
}

impl BarStore for CsvBarStore {
    fn history(&self, code: &str) -> Result<Vec<Bar>, StoreError> {
        let path = self.file_for(code);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|source| StoreError::Csv {
            path: path.clone(),
            source,
        })?;
        let mut bars = Vec::new();
        for record in reader.deserialize::<BarRecord>() {
            let record = record.map_err(|source| StoreError::Csv {
                path: path.clone(),
                source,
            })?;
            bars.push(Bar::from(record));
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    /// Instrument codes are all-digit stems; other CSV files that share
    /// the directory (stocklist.csv, exports) are not instruments.
    fn universe(&self) -> Result<Vec<String>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| StoreError::ReadDir {
            path: self.dir.clone(),
            source,
        })?;
        let mut codes = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) {
                        codes.push(stem.to_string());
                    }
                }
            }
        }
        codes.sort();
        Ok(codes)
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    series: HashMap<String, Vec<Bar>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, mut bars: Vec<Bar>) {
        bars.sort_by_key(|b| b.date);
        self.series.insert(code.into(), bars);
    }
}

impl BarStore for MemoryStore {
    fn history(&self, code: &str) -> Result<Vec<Bar>, StoreError> {
        Ok(self.series.get(code).cloned().unwrap_or_default())
    }

    fn universe(&self) -> Result<Vec<String>, StoreError> {
        let mut codes: Vec<String> = self.series.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

/// Optional code → display-name reference.
///
/// Loaded from a two-column CSV (`symbol,name`). Codes are zero-padded
/// to six digits on load to match the store's naming. A missing or
/// unreadable file degrades to an empty table; an unknown code degrades
/// to a placeholder — never a failure.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: HashMap<String, String>,
}

pub const UNKNOWN_NAME: &str = "unknown";

impl NameTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Self {
        let mut names = HashMap::new();
        let Ok(mut reader) = csv::Reader::from_path(path) else {
            return Self::default();
        };

        #[derive(Deserialize)]
        struct NameRecord {
            symbol: String,
            name: String,
        }

        for record in reader.deserialize::<NameRecord>().flatten() {
            names.insert(pad_code(&record.symbol), record.name);
        }
        Self { names }
    }

    pub fn lookup(&self, code: &str) -> &str {
        self.names.get(code).map(String::as_str).unwrap_or(UNKNOWN_NAME)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Zero-pad an all-digit code to six characters (exchange convention).
fn pad_code(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.len() < 6 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        format!("{trimmed:0>6}")
    } else {
        trimmed.to_string()
    }
}
