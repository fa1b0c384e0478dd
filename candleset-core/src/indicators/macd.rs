//! MACD histogram.
//!
//! MACD line = EMA(fast) - EMA(slow); signal = EMA(signal) of the MACD line;
//! histogram = line - signal.
//! Warmup: slow + signal - 2 leading NaN values.

use super::ema::ema;

/// MACD histogram of `values`.
///
/// The signal EMA is seeded from the first valid span of the MACD line,
/// which itself starts after the slow EMA warmup.
pub fn macd_histogram(values: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
    assert!(fast >= 1 && slow >= 1 && signal >= 1, "MACD periods must be >= 1");

    let n = values.len();
    let mut result = vec![f64::NAN; n];

    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let mut line = vec![f64::NAN; n];
    for i in 0..n {
        if !fast_ema[i].is_nan() && !slow_ema[i].is_nan() {
            line[i] = fast_ema[i] - slow_ema[i];
        }
    }

    let Some(start) = line.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    let signal_line = ema(&line[start..], signal);
    for (offset, s) in signal_line.into_iter().enumerate() {
        if !s.is_nan() {
            result[start + offset] = line[start + offset] - s;
        }
    }

    result
}
