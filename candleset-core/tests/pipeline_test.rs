//! Integration tests for the price-history pipeline.
//!
//! Covers the range invariant of market-hour isolation, fill correctness,
//! and look-ahead contamination for every indicator in the vocabulary:
//! values computed on a truncated series must equal values computed on the
//! full series over the shared prefix.

use candleset_core::{Frame, Nyse, PriceHistory, TransformConfig, CANDLE_COLUMNS};
use candleset_core::data::calendar::MarketCalendar;
use chrono::{DateTime, TimeZone, Utc};

/// Deterministic pseudo-random walk candles on the given index.
fn make_candles(index: Vec<DateTime<Utc>>) -> Frame {
    let n = index.len();
    let mut close = Vec::with_capacity(n);
    let mut price = 100.0_f64;
    for i in 0..n {
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.002;
        price = (price + change).max(10.0);
        close.push(price);
    }
    let open: Vec<f64> = (0..n)
        .map(|i| if i == 0 { close[0] } else { close[i - 1] })
        .collect();
    let high: Vec<f64> = open
        .iter()
        .zip(&close)
        .map(|(o, c)| o.max(*c) + 0.05)
        .collect();
    let low: Vec<f64> = open
        .iter()
        .zip(&close)
        .map(|(o, c)| o.min(*c) - 0.05)
        .collect();
    let vwap: Vec<f64> = open.iter().zip(&close).map(|(o, c)| (o + c) / 2.0).collect();
    let volume: Vec<f64> = (0..n).map(|i| 1000.0 + (i % 7) as f64 * 50.0).collect();
    let trades: Vec<f64> = (0..n).map(|i| 10.0 + (i % 5) as f64).collect();

    Frame::new(
        index,
        CANDLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        vec![open, high, low, close, volume, trades, vwap],
    )
    .unwrap()
}

fn two_session_history() -> PriceHistory {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 3, 23, 59, 0).unwrap();
    let minutes = Nyse::new().session_minutes(start, end);
    assert_eq!(minutes.len(), 780);
    PriceHistory::new("SPY", make_candles(minutes)).unwrap()
}

#[test]
fn isolation_never_extends_the_range() {
    let history = two_session_history();

    // Sparse feed: keep every third minute only.
    let index: Vec<DateTime<Utc>> = history
        .data()
        .index()
        .iter()
        .copied()
        .step_by(3)
        .collect();
    let sparse = PriceHistory::new("SPY", history.data().reindex(&index)).unwrap();

    let isolated = sparse.isolate_market_hours(&Nyse::new()).unwrap();
    assert!(isolated.start_date() >= sparse.start_date());
    assert!(isolated.end_date() <= sparse.end_date());
    // Every session minute inside the range is present, dense.
    assert_eq!(
        isolated.data().len(),
        Nyse::new()
            .session_minutes(sparse.start_date(), sparse.end_date())
            .len()
    );
}

#[test]
fn fill_after_isolation_leaves_no_gaps() {
    let history = two_session_history();
    let index: Vec<DateTime<Utc>> = history
        .data()
        .index()
        .iter()
        .copied()
        .enumerate()
        .filter(|(i, _)| !(100..=110).contains(i) && !(500..=520).contains(i))
        .map(|(_, ts)| ts)
        .collect();
    let gappy = PriceHistory::new("SPY", history.data().reindex(&index)).unwrap();

    let filled = gappy
        .isolate_market_hours(&Nyse::new())
        .unwrap()
        .fill_nan_candles()
        .unwrap();

    assert_eq!(filled.data().len(), 780);
    for row in 0..filled.data().len() {
        assert!(!filled.data().row_has_nan(row));
    }
    // Inside the first gap: flat at the last known close, zero activity.
    let close_before = filled.data().get(99, "close").unwrap();
    assert_eq!(filled.data().get(100, "close").unwrap(), close_before);
    assert_eq!(filled.data().get(100, "open").unwrap(), close_before);
    assert_eq!(filled.data().get(100, "vwap").unwrap(), close_before);
    assert_eq!(filled.data().get(100, "volume").unwrap(), 0.0);
    assert_eq!(filled.data().get(100, "trades").unwrap(), 0.0);
}

#[test]
fn indicators_are_leakage_free() {
    let history = two_session_history();
    let truncated = PriceHistory::new("SPY", history.data().slice(0..400)).unwrap();

    let indicators: Vec<String> = [
        "oc_ret",
        "rets_close",
        "log_ret_close",
        "pdiff_open",
        "pdiff_high",
        "pdiff_vwap",
        "ma_20",
        "ma_50",
        "rsi",
        "macd",
        "bbands",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    let full = history.add_ta_indicators(&indicators, "close").unwrap();
    let short = truncated.add_ta_indicators(&indicators, "close").unwrap();

    for column in full.data().columns() {
        let full_series = full.data().try_column(column).unwrap();
        let short_series = short.data().try_column(column).unwrap();
        for row in 0..short.data().len() {
            let f = full_series[row];
            let s = short_series[row];
            if f.is_nan() && s.is_nan() {
                continue;
            }
            assert!(
                (f - s).abs() < 1e-10,
                "{column}: look-ahead contamination at row {row}: full={f}, truncated={s}"
            );
        }
    }
}

#[test]
fn transform_output_is_dense_and_in_range() {
    let history = two_session_history();
    let config = TransformConfig::default();
    let transformed = history.transform(&config).unwrap();

    assert!(transformed.start_date() >= history.start_date());
    assert!(transformed.end_date() <= history.end_date());
    assert!(transformed.data().len() > 0);
    for row in 0..transformed.data().len() {
        assert!(!transformed.data().row_has_nan(row));
    }
    // Raw price levels are gone; counts and indicators remain.
    for gone in ["open", "high", "low", "close", "vwap"] {
        assert!(!transformed.data().has_column(gone));
    }
    for kept in ["volume", "trades", "oc_ret", "ma_200", "rsi", "macd", "bbands_b"] {
        assert!(transformed.data().has_column(kept), "missing {kept}");
    }
}

#[test]
fn pipeline_stages_do_not_mutate_their_input() {
    let history = two_session_history();
    let before = history.data().clone();

    let _ = history.isolate_market_hours(&Nyse::new()).unwrap();
    let _ = history.fill_nan_candles().unwrap();
    let _ = history
        .add_ta_indicators(&["oc_ret".to_string()], "close")
        .unwrap();
    let _ = history.drop_non_scalable(None).unwrap();

    assert_eq!(history.data(), &before);
}
