//! CSV loading for price series and precomputed signal bars.
//!
//! Column names are matched case-insensitively. The timestamp column may be
//! called `timestamp`, `datetime` or `date`; the price column is `close`.
//! Signal columns use their data-file spelling (`RSI_BUY`, `BB_SELL`, ...).
//! Extra columns are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use log::debug;
use signalbt_core::domain::{Bar, PricePoint, SignalName, SignalSet};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: cannot parse timestamp '{value}'")]
    Timestamp { row: usize, value: String },
    #[error("row {row}: cannot parse close '{value}'")]
    Close { row: usize, value: String },
    #[error("row {row}: cannot parse {signal} flag '{value}'")]
    Flag {
        row: usize,
        signal: SignalName,
        value: String,
    },
}

const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp", "datetime", "date"];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Load `(timestamp, close)` points from a CSV file.
pub fn load_prices(path: &Path) -> Result<Vec<PricePoint>, LoadError> {
    let prices = read_prices(File::open(path)?)?;
    debug!("loaded {} price points from {}", prices.len(), path.display());
    Ok(prices)
}

/// Load bars with precomputed signal columns from a CSV file.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let bars = read_bars(File::open(path)?)?;
    debug!("loaded {} bars from {}", bars.len(), path.display());
    Ok(bars)
}

pub fn read_prices<R: Read>(reader: R) -> Result<Vec<PricePoint>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let columns = Columns::locate(rdr.headers()?)?;

    let mut prices = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        prices.push(PricePoint::new(
            columns.timestamp(&record, row)?,
            columns.close(&record, row)?,
        ));
    }
    Ok(prices)
}

/// Bars carry only the signal columns present in the file; the engine
/// rejects a missing signal its aggregation policy needs.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let columns = Columns::locate(&headers)?;
    let signal_columns: Vec<(SignalName, usize)> = SignalName::ALL
        .into_iter()
        .filter_map(|name| find_column(&headers, &[name.as_str()]).map(|idx| (name, idx)))
        .collect();

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let mut signals = SignalSet::new();
        for &(signal, idx) in &signal_columns {
            let value = record.get(idx).unwrap_or_default();
            let flag = parse_flag(value).ok_or_else(|| LoadError::Flag {
                row,
                signal,
                value: value.to_string(),
            })?;
            signals.insert(signal, flag);
        }
        bars.push(Bar::new(
            columns.timestamp(&record, row)?,
            columns.close(&record, row)?,
            signals,
        ));
    }
    Ok(bars)
}

// ─── Parsing helpers ────────────────────────────────────────────────

struct Columns {
    timestamp: usize,
    close: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, LoadError> {
        let timestamp = find_column(headers, &TIMESTAMP_COLUMNS)
            .ok_or_else(|| LoadError::MissingColumn(TIMESTAMP_COLUMNS.join("|")))?;
        let close = find_column(headers, &["close"])
            .ok_or_else(|| LoadError::MissingColumn("close".into()))?;
        Ok(Self { timestamp, close })
    }

    fn timestamp(&self, record: &StringRecord, row: usize) -> Result<NaiveDateTime, LoadError> {
        let value = record.get(self.timestamp).unwrap_or_default();
        parse_timestamp(value).ok_or_else(|| LoadError::Timestamp {
            row,
            value: value.to_string(),
        })
    }

    fn close(&self, record: &StringRecord, row: usize) -> Result<f64, LoadError> {
        let value = record.get(self.close).unwrap_or_default();
        value.parse::<f64>().map_err(|_| LoadError::Close {
            row,
            value: value.to_string(),
        })
    }
}

/// First header matching any of `names`, in the order of `names`.
fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

/// RFC 3339 (converted to UTC), `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// or a bare date at midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
