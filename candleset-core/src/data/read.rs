//! CSV ingestion for per-symbol candle files.
//!
//! Files live at `<data_dir>/<symbol>/<symbol>_1Min.csv` with a header row,
//! a `time` column of ISO-8601 timestamps, and exactly the candle columns.
//! Reads happen once here at the boundary; everything downstream operates on
//! in-memory frames.

use crate::domain::candle::{frame_from_candles, Candle, CANDLE_COLUMNS};
use crate::history::{HistoryError, PriceHistory};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("ingest failed for {path}: {reason}")]
    Ingest { path: PathBuf, reason: String },

    #[error("candles file {path} has unexpected columns {found:?}")]
    Schema { path: PathBuf, found: Vec<String> },

    #[error("unparseable timestamp {value:?} in {path}")]
    Timestamp { path: PathBuf, value: String },

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Conventional location of a symbol's minute-candle file.
pub fn candles_path(data_dir: &Path, symbol: &str) -> PathBuf {
    data_dir.join(symbol).join(format!("{symbol}_1Min.csv"))
}

/// Read a symbol's candle CSV from the conventional location.
pub fn read_price_history(symbol: &str, data_dir: &Path) -> Result<PriceHistory, ReadError> {
    read_price_history_from(symbol, &candles_path(data_dir, symbol))
}

/// Read a symbol's candle CSV from an explicit path.
pub fn read_price_history_from(symbol: &str, path: &Path) -> Result<PriceHistory, ReadError> {
    let ingest = |reason: String| ReadError::Ingest {
        path: path.to_path_buf(),
        reason,
    };

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .and_then(LazyFrame::collect)
        .map_err(|e| ingest(e.to_string()))?;

    // The column set must match exactly: time plus the seven candle columns.
    let found: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut expected: BTreeSet<&str> = CANDLE_COLUMNS.iter().copied().collect();
    expected.insert("time");
    let found_set: BTreeSet<&str> = found.iter().map(|name| name.as_str()).collect();
    if found_set != expected {
        return Err(ReadError::Schema {
            path: path.to_path_buf(),
            found,
        });
    }

    let time = df
        .column("time")
        .and_then(|c| c.str())
        .map_err(|e| ingest(e.to_string()))?;
    let mut index: Vec<DateTime<Utc>> = Vec::with_capacity(df.height());
    for raw in time.into_iter() {
        let raw = raw.ok_or_else(|| ReadError::Timestamp {
            path: path.to_path_buf(),
            value: "<null>".to_string(),
        })?;
        let ts = parse_timestamp(raw).ok_or_else(|| ReadError::Timestamp {
            path: path.to_path_buf(),
            value: raw.to_string(),
        })?;
        index.push(ts);
    }

    let mut values: Vec<Vec<f64>> = Vec::with_capacity(CANDLE_COLUMNS.len());
    for name in CANDLE_COLUMNS {
        let series = df
            .column(name)
            .and_then(|c| c.cast(&DataType::Float64))
            .map_err(|e| ingest(e.to_string()))?;
        let ca = series.f64().map_err(|e| ingest(e.to_string()))?;
        values.push(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect());
    }

    let candles: Vec<Candle> = index
        .into_iter()
        .enumerate()
        .map(|(row, time)| Candle {
            time,
            open: values[0][row],
            high: values[1][row],
            low: values[2][row],
            close: values[3][row],
            volume: values[4][row],
            trades: values[5][row],
            vwap: values[6][row],
        })
        .collect();

    let frame = frame_from_candles(&candles).map_err(|e| ingest(e.to_string()))?;
    Ok(PriceHistory::new(symbol, frame)?)
}

/// Accepts RFC 3339, space-separated offset timestamps, and naive
/// timestamps (assumed UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%z") {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}
