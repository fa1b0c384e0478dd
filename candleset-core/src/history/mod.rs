//! Per-symbol price history and its transformation pipeline.
//!
//! A `PriceHistory` wraps one symbol's time-indexed candle frame. Every
//! pipeline stage returns a new instance; the canonical order is
//! isolate market hours → fill NaN candles → add indicators → drop
//! non-scalable columns → trim NaN rows. Rolling indicators produce leading
//! NaNs, which is why the final trim runs after indicator derivation.

use crate::data::calendar::{get_calendar, CalendarError, MarketCalendar};
use crate::frame::{trim_nan_rows, Frame, FrameError};
use crate::indicators::{bbands, log_returns, macd_histogram, rsi, simple_returns, sma};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BBANDS_PERIOD: usize = 5;
const BBANDS_MULT: f64 = 2.0;

/// Price-level columns that must not enter a scaled feature set.
const NON_SCALABLE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "vwap"];

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("{symbol}: cannot construct an empty price history")]
    EmptyData { symbol: String },

    #[error("{symbol}: index is not strictly increasing")]
    NonMonotonicIndex { symbol: String },

    #[error("indicator {name:?}: {reason}")]
    InvalidIndicator { name: String, reason: String },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Configuration for the full transformation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Exchange calendar name resolved through `data::calendar::get_calendar`.
    pub calendar: String,
    /// Ordered indicator requests; see `add_ta_indicators` for the vocabulary.
    pub indicators: Vec<String>,
    /// Source column for single-series indicators.
    pub main_column: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            calendar: "NYSE".to_string(),
            indicators: [
                "oc_ret",
                "log_ret_close",
                "pdiff_open",
                "pdiff_high",
                "pdiff_low",
                "pdiff_vwap",
                "ma_50",
                "ma_200",
                "rsi",
                "macd",
                "bbands",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            main_column: "close".to_string(),
        }
    }
}

impl TransformConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

/// One symbol's calendar-aligned candle (or feature) series.
///
/// Immutable: pipeline stages hand back new instances and never touch the
/// original. `start_date`/`end_date` always mirror the first and last index
/// entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    symbol: String,
    data: Frame,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

impl PriceHistory {
    pub fn new(symbol: impl Into<String>, data: Frame) -> Result<Self, HistoryError> {
        let symbol = symbol.into();
        if data.is_empty() {
            return Err(HistoryError::EmptyData { symbol });
        }
        if !data.index_strictly_increasing() {
            return Err(HistoryError::NonMonotonicIndex { symbol });
        }
        let start_date = data.index()[0];
        let end_date = data.index()[data.len() - 1];
        Ok(Self {
            symbol,
            data,
            start_date,
            end_date,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn data(&self) -> &Frame {
        &self.data
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    /// Remove leading and trailing runs of NaN-containing rows.
    pub fn trim_nan_rows(&self) -> Result<Self, HistoryError> {
        Self::new(&*self.symbol, trim_nan_rows(&self.data))
    }

    /// Reindex onto the calendar's session minutes between the existing first
    /// and last timestamp, then gap-trim. Missing session minutes become NaN
    /// rows; off-session rows are dropped. The range never extends beyond the
    /// original data.
    pub fn isolate_market_hours(
        &self,
        calendar: &dyn MarketCalendar,
    ) -> Result<Self, HistoryError> {
        let minutes = calendar.session_minutes(self.start_date, self.end_date);
        Self::new(&*self.symbol, self.data.reindex(&minutes))?.trim_nan_rows()
    }

    /// Fill missing candle values: `close` forward-fills from its own
    /// history, `open/high/low/vwap` take the same row's filled close, and
    /// `volume/trades` become zero. A missing minute is modeled as a
    /// zero-volume candle at the last known price; interpolating instead
    /// would leak future prices.
    pub fn fill_nan_candles(&self) -> Result<Self, HistoryError> {
        let close = self.data.try_column("close")?;
        let mut filled_close = close.to_vec();
        let mut last = f64::NAN;
        for value in filled_close.iter_mut() {
            if value.is_nan() {
                *value = last;
            } else {
                last = *value;
            }
        }

        let mut frame = self.data.with_column("close", filled_close.clone())?;
        for name in ["open", "high", "low", "vwap"] {
            let patched: Vec<f64> = frame
                .try_column(name)?
                .iter()
                .zip(&filled_close)
                .map(|(&value, &close)| if value.is_nan() { close } else { value })
                .collect();
            frame = frame.with_column(name, patched)?;
        }
        for name in ["volume", "trades"] {
            let patched: Vec<f64> = frame
                .try_column(name)?
                .iter()
                .map(|&value| if value.is_nan() { 0.0 } else { value })
                .collect();
            frame = frame.with_column(name, patched)?;
        }

        Self::new(&*self.symbol, frame)
    }

    /// Derive the requested indicator columns and join them to the data.
    ///
    /// Vocabulary:
    /// * `oc_ret` — close/open - 1 for the same row
    /// * `rets_<col>` — simple returns of `<col>`
    /// * `log_ret_<col>` — log returns of `<col>`
    /// * `pdiff_<col>` — `<col>`/`main_column` - 1 for the same row
    /// * `ma_<n>` — SMA(n) of `main_column`, as a ratio to the current value
    /// * `rsi` — RSI(14) of `main_column`
    /// * `macd` — MACD(12,26,9) histogram of `main_column`
    /// * `bbands` — Bollinger(5, 2.0) bandwidth (`bbands_b`) and %B (`bbands_p`)
    ///
    /// Names outside the vocabulary are skipped without error; a recognized
    /// prefix with a malformed parameter is rejected.
    pub fn add_ta_indicators(
        &self,
        indicators: &[String],
        main_column: &str,
    ) -> Result<Self, HistoryError> {
        let main = self.data.try_column(main_column)?.to_vec();

        let mut names: Vec<String> = Vec::new();
        let mut series: Vec<Vec<f64>> = Vec::new();
        let push = |names: &mut Vec<String>, series: &mut Vec<Vec<f64>>,
                        name: String,
                        values: Vec<f64>| {
            // A repeated request computes the same series; keep the first.
            if !names.contains(&name) {
                names.push(name);
                series.push(values);
            }
        };

        for name in indicators {
            if name == "oc_ret" {
                let close = self.data.try_column("close")?;
                let open = self.data.try_column("open")?;
                let values = close
                    .iter()
                    .zip(open)
                    .map(|(&c, &o)| c / o - 1.0)
                    .collect();
                push(&mut names, &mut series, name.clone(), values);
            } else if name == "rsi" {
                push(&mut names, &mut series, name.clone(), rsi(&main, RSI_PERIOD));
            } else if name == "macd" {
                push(
                    &mut names,
                    &mut series,
                    name.clone(),
                    macd_histogram(&main, MACD_FAST, MACD_SLOW, MACD_SIGNAL),
                );
            } else if name == "bbands" {
                let (bandwidth, percent_b) = bbands(&main, BBANDS_PERIOD, BBANDS_MULT);
                push(&mut names, &mut series, "bbands_b".to_string(), bandwidth);
                push(&mut names, &mut series, "bbands_p".to_string(), percent_b);
            } else if let Some(column) = name.strip_prefix("log_ret_") {
                let values = log_returns(self.data.try_column(column)?);
                push(&mut names, &mut series, name.clone(), values);
            } else if let Some(column) = name.strip_prefix("rets_") {
                let values = simple_returns(self.data.try_column(column)?);
                push(&mut names, &mut series, name.clone(), values);
            } else if let Some(raw) = name.strip_prefix("ma_") {
                let period: usize =
                    raw.parse()
                        .ok()
                        .filter(|&p| p >= 1)
                        .ok_or_else(|| HistoryError::InvalidIndicator {
                            name: name.clone(),
                            reason: format!("{raw:?} is not a valid window length"),
                        })?;
                let values = sma(&main, period)
                    .into_iter()
                    .zip(&main)
                    .map(|(ma, &current)| ma / current - 1.0)
                    .collect();
                push(&mut names, &mut series, name.clone(), values);
            } else if let Some(column) = name.strip_prefix("pdiff_") {
                let values = self
                    .data
                    .try_column(column)?
                    .iter()
                    .zip(&main)
                    .map(|(&value, &current)| value / current - 1.0)
                    .collect();
                push(&mut names, &mut series, name.clone(), values);
            }
            // Anything else is outside the vocabulary and skipped.
        }

        let mut frame = self.data.clone();
        for (name, values) in names.into_iter().zip(series) {
            frame = frame.append_column(name, values)?;
        }
        Self::new(&*self.symbol, frame)
    }

    /// Drop raw price-level columns; their absolute levels are
    /// non-stationary and must not be scaled into the feature set.
    pub fn drop_non_scalable(&self, columns: Option<&[&str]>) -> Result<Self, HistoryError> {
        let columns = columns.unwrap_or(&NON_SCALABLE_COLUMNS);
        Self::new(&*self.symbol, self.data.drop_columns(columns)?)
    }

    /// The full pipeline in its fixed order.
    pub fn transform(&self, config: &TransformConfig) -> Result<Self, HistoryError> {
        let calendar = get_calendar(&config.calendar)?;
        self.isolate_market_hours(calendar.as_ref())?
            .fill_nan_candles()?
            .add_ta_indicators(&config.indicators, &config.main_column)?
            .drop_non_scalable(None)?
            .trim_nan_rows()
    }
}
