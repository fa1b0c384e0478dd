//! Data boundary: CSV ingestion and the trading-calendar seam.

pub mod calendar;
pub mod read;

pub use calendar::{get_calendar, CalendarError, MarketCalendar, Nyse};
pub use read::{candles_path, read_price_history, read_price_history_from, ReadError};
