//! candleset-core — minute-candle feature pipeline and windowed dataset engine.
//!
//! This crate turns raw per-symbol minute candles into model-ready training
//! batches:
//! - Frame: time-indexed f64 table with NaN gap semantics
//! - Gap trimmer: leading/trailing incomplete-row removal
//! - PriceHistory: per-symbol pipeline (market-hour isolation, NaN filling,
//!   indicator derivation, column pruning)
//! - Indicator kernels: backward-looking, leakage-free series transforms
//! - StockDataset: multi-symbol join, one-step-ahead targets, temporal
//!   train/valid/test splitting, feature scaling, window sampling
//! - Market calendar seam for session-minute generation
//!
//! Every transformation is a pure function returning a new value, which is
//! what keeps the pipeline composable and safe to fan out across symbols.

pub mod data;
pub mod dataset;
pub mod domain;
pub mod frame;
pub mod history;
pub mod indicators;

pub use data::{get_calendar, read_price_history, MarketCalendar, Nyse, ReadError};
pub use dataset::{
    read_stock_dataset, Batch, DatasetError, DatasetSplit, PairedBatch, Scaler, ScalerError,
    StockDataset,
};
pub use domain::{Candle, CANDLE_COLUMNS};
pub use frame::{trim_nan_rows, Frame, FrameError};
pub use history::{HistoryError, PriceHistory, TransformConfig};
