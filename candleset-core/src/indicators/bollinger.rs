//! Bollinger band width and %B.
//!
//! Middle = SMA(period); bands at middle +/- mult * stddev (sample stddev,
//! divide by N-1, matching the common dataframe default).
//! Two derived series:
//! - bandwidth percent: (upper - lower) / middle * 100
//! - %B: (value - lower) / (upper - lower)
//! Warmup: period - 1 leading NaN values.

/// Bollinger `(bandwidth_percent, percent_b)` of `values`.
///
/// Zero-width bands (constant window) and a zero middle produce NaN for the
/// affected row rather than an infinity.
pub fn bbands(values: &[f64], period: usize, mult: f64) -> (Vec<f64>, Vec<f64>) {
    assert!(period >= 2, "Bollinger period must be >= 2");

    let n = values.len();
    let mut bandwidth = vec![f64::NAN; n];
    let mut percent_b = vec![f64::NAN; n];
    if n < period {
        return (bandwidth, percent_b);
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }

        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (period as f64 - 1.0);
        let stddev = variance.sqrt();

        let upper = mean + mult * stddev;
        let lower = mean - mult * stddev;
        let width = upper - lower;

        if mean != 0.0 {
            bandwidth[i] = width / mean * 100.0;
        }
        if width != 0.0 {
            percent_b[i] = (values[i] - lower) / width;
        }
    }

    (bandwidth, percent_b)
}
