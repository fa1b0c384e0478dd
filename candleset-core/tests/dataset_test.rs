//! End-to-end dataset tests: CSV files on disk through the transform
//! pipeline into aligned, split, scaled, batchable datasets.

use candleset_core::data::calendar::MarketCalendar;
use candleset_core::dataset::read_stock_dataset;
use candleset_core::{Nyse, TransformConfig};
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::{Path, PathBuf};

fn temp_data_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("candleset_ds_{tag}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a deterministic two-session candle file, skipping the row indices
/// in `gaps` to simulate an illiquid feed.
fn write_symbol_csv(dir: &Path, symbol: &str, seed: u64, gaps: &[usize]) -> Vec<DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 3, 23, 59, 0).unwrap();
    let minutes = Nyse::new().session_minutes(start, end);

    let symbol_dir = dir.join(symbol);
    std::fs::create_dir_all(&symbol_dir).unwrap();
    let mut file =
        std::fs::File::create(symbol_dir.join(format!("{symbol}_1Min.csv"))).unwrap();
    writeln!(file, "time,open,high,low,close,volume,trades,vwap").unwrap();

    let mut price = 100.0 + seed as f64;
    let mut written = Vec::new();
    for (i, ts) in minutes.iter().enumerate() {
        let mix = (i as u64)
            .wrapping_mul(6364136223846793005)
            .wrapping_add(seed);
        let change = ((mix % 200) as f64 - 100.0) * 0.002;
        let open = price;
        price = (price + change).max(10.0);
        let close = price;
        if gaps.contains(&i) {
            continue;
        }
        let high = open.max(close) + 0.05;
        let low = open.min(close) - 0.05;
        let vwap = (open + close) / 2.0;
        let volume = 500 + (i % 11) * 20;
        let trades = 5 + i % 7;
        writeln!(
            file,
            "{},{open},{high},{low},{close},{volume},{trades},{vwap}",
            ts.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
        .unwrap();
        written.push(*ts);
    }
    written
}

/// Six feature columns per symbol after the transform.
fn test_config() -> TransformConfig {
    TransformConfig {
        indicators: ["oc_ret", "rets_close", "ma_5", "rsi"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        ..TransformConfig::default()
    }
}

#[test]
fn csv_to_dataset_alignment_holds() {
    let dir = temp_data_dir("align");
    write_symbol_csv(&dir, "SPY", 1, &[]);
    write_symbol_csv(&dir, "SPXS", 2, &[300, 301, 302]);

    let dataset =
        read_stock_dataset(&["SPY", "SPXS"], &dir, "oc_ret", 64, Some(&test_config())).unwrap();

    assert_eq!(dataset.symbols(), ["SPY", "SPXS"]);
    assert_eq!(dataset.n_symbols(), 2);
    assert_eq!(dataset.n_features(), 12);
    assert_eq!(dataset.target_columns(), ["SPY_oc_ret", "SPXS_oc_ret"]);

    // x and y share an index; y at i is the target value one joined row later.
    assert_eq!(dataset.x().index(), dataset.y().index());
    assert_eq!(dataset.data().len(), dataset.len() + 1);
    for i in [0, 17, dataset.len() - 1] {
        for target in ["SPY_oc_ret", "SPXS_oc_ret"] {
            assert_eq!(
                dataset.y().get(i, target).unwrap(),
                dataset.data().get(i + 1, target).unwrap()
            );
        }
    }

    // The interior SPXS feed gap was filled as zero-volume candles, not
    // dropped: the join stays dense.
    for row in 0..dataset.len() {
        assert!(!dataset.x().row_has_nan(row));
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn split_boundaries_scaler_and_shapes() {
    let dir = temp_data_dir("split");
    write_symbol_csv(&dir, "SPY", 1, &[]);
    write_symbol_csv(&dir, "SPXS", 2, &[]);

    let dataset =
        read_stock_dataset(&["SPY", "SPXS"], &dir, "oc_ret", 64, Some(&test_config())).unwrap();

    let split = dataset
        .train_valid_test_split(Duration::minutes(90), Duration::minutes(90), true)
        .unwrap();
    let scaler = split.scaler.as_ref().expect("scaler returned for reuse");

    // Disjoint, ordered, and jointly exhaustive.
    let total = split.train.len() + split.valid.len() + split.test.len();
    assert_eq!(total, dataset.len());
    assert!(split.train.x().index().last().unwrap() < &split.valid.x().index()[0]);
    assert!(split.valid.x().index().last().unwrap() < &split.test.x().index()[0]);

    // Scaler carries train statistics: applying it to the raw train
    // partition standardizes it.
    let before = scaler.clone();
    let unscaled = dataset
        .train_valid_test_split(Duration::minutes(90), Duration::minutes(90), false)
        .unwrap();
    let rescaled = scaler.transform(unscaled.train.x()).unwrap();
    for column in ["SPY_oc_ret", "SPY_rsi"] {
        let series = rescaled.try_column(column).unwrap();
        let mean: f64 = series.iter().sum::<f64>() / series.len() as f64;
        assert!(mean.abs() < 1e-9, "{column} mean {mean} not centered");
    }

    // Applying it to validation/test never alters its parameters, and those
    // partitions' own statistics are not what it holds.
    let _ = scaler.transform(unscaled.valid.x()).unwrap();
    let _ = scaler.transform(unscaled.test.x()).unwrap();
    assert_eq!(scaler, &before);
    assert_ne!(&unscaled.test.fit_scaler(), scaler);

    // Batch sampling on the scaled training partition, both shuffle modes.
    let eligible = split.train.get_batchable_index(true, &Nyse::new());
    let mut rng = StdRng::seed_from_u64(123);
    for shuffle in [true, false] {
        let batch = split
            .train
            .get_batch(8, &eligible, shuffle, true, &mut rng)
            .unwrap();
        assert_eq!(batch.x.dim(), (8, 64, 12));
        assert_eq!(batch.y.dim(), (8, 2));
    }

    // Live inference window comes from the joined table, scaled.
    let scaled_full = dataset.apply_scaler(scaler).unwrap();
    let live = scaled_full.prediction_x(64).unwrap();
    assert_eq!(live.dim(), (1, 64, 12));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn market_open_restriction_shrinks_the_eligible_set() {
    let dir = temp_data_dir("open");
    write_symbol_csv(&dir, "SPY", 1, &[]);

    let dataset =
        read_stock_dataset(&["SPY"], &dir, "oc_ret", 64, Some(&test_config())).unwrap();

    let nyse = Nyse::new();
    let all = dataset.get_batchable_index(true, &nyse);
    let in_session = dataset.get_batchable_index(false, &nyse);

    assert!(!all.is_empty());
    assert!(in_session.len() < all.len());
    // Every restricted position clears its session open by the lookback.
    let lookback = Duration::minutes(64);
    for &position in &in_session {
        let ts = dataset.x().index()[position];
        let open = nyse.session_open(ts).expect("session minute");
        assert!(ts >= open + lookback);
    }
    // And the excluded ones are exactly the early-session anchors.
    for &position in all.iter().filter(|&p| !in_session.contains(p)) {
        let ts = dataset.x().index()[position];
        match nyse.session_open(ts) {
            Some(open) => assert!(ts < open + lookback),
            None => {}
        }
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn seeded_batches_are_identical_across_runs() {
    let dir = temp_data_dir("seed");
    write_symbol_csv(&dir, "SPY", 1, &[]);
    write_symbol_csv(&dir, "SPXS", 2, &[]);

    let dataset =
        read_stock_dataset(&["SPY", "SPXS"], &dir, "oc_ret", 32, Some(&test_config())).unwrap();
    let eligible = dataset.get_batchable_index(true, &Nyse::new());

    let mut rng_a = StdRng::seed_from_u64(77);
    let mut rng_b = StdRng::seed_from_u64(77);
    let a = dataset.get_batch(16, &eligible, true, false, &mut rng_a).unwrap();
    let b = dataset.get_batch(16, &eligible, true, false, &mut rng_b).unwrap();
    assert_eq!(a.x, b.x);
    assert_eq!(a.y, b.y);

    // Reading the same files twice produces the same dataset.
    let again =
        read_stock_dataset(&["SPY", "SPXS"], &dir, "oc_ret", 32, Some(&test_config())).unwrap();
    assert_eq!(dataset.fingerprint(), again.fingerprint());

    let _ = std::fs::remove_dir_all(&dir);
}
