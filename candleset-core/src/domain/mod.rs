//! Domain types for candleset

pub mod candle;

pub use candle::{frame_from_candles, Candle, CANDLE_COLUMNS};

/// Symbol type alias
pub type Symbol = String;
