//! Indicator kernels for the price-history pipeline.
//!
//! Every kernel is a pure function over an `&[f64]` series: output index `t`
//! depends only on inputs at `t` and earlier, with NaN for the warmup span
//! where a rolling window is not yet full. NaN inputs propagate rather than
//! being silently skipped.
//!
//! The name-to-kernel dispatch (including the `ma_<n>` / `pdiff_<col>`
//! style prefixed names) lives with the pipeline in `history`.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod returns;
pub mod rsi;
pub mod sma;

pub use bollinger::bbands;
pub use ema::ema;
pub use macd::macd_histogram;
pub use returns::{log_returns, simple_returns};
pub use rsi::rsi;
pub use sma::sma;

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
