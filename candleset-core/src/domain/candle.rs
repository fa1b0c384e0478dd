//! Candle — the fundamental market data unit.

use crate::frame::{Frame, FrameError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical candle column order. `volume` and `trades` are whole counts
/// conceptually but carried as `f64` so a missing minute can hold NaN.
pub const CANDLE_COLUMNS: [&str; 7] =
    ["open", "high", "low", "close", "volume", "trades", "vwap"];

/// One-minute OHLCV candle for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trades: f64,
    pub vwap: f64,
}

impl Candle {
    /// Values in `CANDLE_COLUMNS` order.
    pub fn values(&self) -> [f64; 7] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.trades,
            self.vwap,
        ]
    }

    /// Returns true if any field is NaN (void candle).
    pub fn is_void(&self) -> bool {
        self.values().iter().any(|v| v.is_nan())
    }

    /// Basic OHLC sanity: high is the ceiling, low the floor, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
            && self.trades >= 0.0
    }
}

/// Build a candle-column frame from a time-ordered candle slice.
pub fn frame_from_candles(candles: &[Candle]) -> Result<Frame, FrameError> {
    let index: Vec<DateTime<Utc>> = candles.iter().map(|c| c.time).collect();
    let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(candles.len()); CANDLE_COLUMNS.len()];
    for candle in candles {
        for (series, value) in values.iter_mut().zip(candle.values()) {
            series.push(value);
        }
    }
    Frame::new(
        index,
        CANDLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        values,
    )
}
