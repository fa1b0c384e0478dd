//! Multi-symbol training dataset.
//!
//! A `StockDataset` concatenates several transformed price histories onto a
//! shared timeline, derives one-step-ahead targets, and provides temporal
//! splitting, scaling, and window sampling. Columns are namespaced
//! `{symbol}_{column}`; `y` holds the target column of every symbol shifted
//! one row ahead of `x` and re-pointed onto `x`'s index, so row `i` of `y`
//! is the realized outcome of the step ending at row `i` of `x`.

pub mod batch;
pub mod scaler;

pub use batch::{Batch, PairedBatch};
pub use scaler::{Scaler, ScalerError};

use crate::data::calendar::MarketCalendar;
use crate::data::read::{read_price_history, ReadError};
use crate::frame::{trim_nan_rows, Frame, FrameError};
use crate::history::{HistoryError, PriceHistory, TransformConfig};
use chrono::Duration;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset requires at least one price history")]
    NoHistories,

    #[error("history for {symbol} does not contain target column {column:?}")]
    MissingTargetColumn { symbol: String, column: String },

    #[error("symbol {0} appears more than once")]
    DuplicateSymbol(String),

    #[error("joined data has {have} rows, need at least {needed}")]
    InsufficientRows { needed: usize, have: usize },

    #[error("cannot change the column set of a dataset")]
    ColumnMismatch,

    #[error("training window would end at or before the first timestamp")]
    InsufficientTrainingData,

    #[error("no eligible batch positions")]
    NoEligiblePositions,

    #[error("batch of {requested} exceeds {available} eligible positions")]
    BatchExceedsEligible { requested: usize, available: usize },

    #[error("position {position} outside the batchable range [{min}, {max}]")]
    PositionOutOfRange {
        position: usize,
        min: usize,
        max: usize,
    },

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Scaler(#[from] ScalerError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Column bookkeeping for one joined symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolColumns {
    pub symbol: String,
    pub original: Vec<String>,
    pub prefixed: Vec<String>,
}

/// Train/valid/test partitions plus the scaler fitted on train (if any).
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: StockDataset,
    pub valid: StockDataset,
    pub test: StockDataset,
    pub scaler: Option<Scaler>,
}

/// Time-aligned multi-symbol feature/target dataset.
#[derive(Debug, Clone)]
pub struct StockDataset {
    symbols: Vec<SymbolColumns>,
    target_columns: Vec<String>,
    n_time_steps: usize,
    /// Joined and gap-trimmed table over the full range, one row longer than
    /// `x`. Live inference windows come from here. On derived datasets
    /// (partitions, swapped copies) this tracks `x`.
    data: Frame,
    x: Frame,
    y: Frame,
}

impl StockDataset {
    /// Join histories on their shared timeline and derive shifted targets.
    pub fn new(
        histories: Vec<PriceHistory>,
        target_column: &str,
        n_time_steps: usize,
    ) -> Result<Self, DatasetError> {
        if histories.is_empty() {
            return Err(DatasetError::NoHistories);
        }

        let mut symbols: Vec<SymbolColumns> = Vec::with_capacity(histories.len());
        let mut target_columns = Vec::with_capacity(histories.len());
        let mut prefixed_frames = Vec::with_capacity(histories.len());
        for history in &histories {
            let symbol = history.symbol();
            if symbols.iter().any(|s| s.symbol == symbol) {
                return Err(DatasetError::DuplicateSymbol(symbol.to_string()));
            }
            let original = history.data().columns().to_vec();
            if !original.iter().any(|c| c == target_column) {
                return Err(DatasetError::MissingTargetColumn {
                    symbol: symbol.to_string(),
                    column: target_column.to_string(),
                });
            }
            let prefixed: Vec<String> =
                original.iter().map(|c| format!("{symbol}_{c}")).collect();
            target_columns.push(format!("{symbol}_{target_column}"));
            prefixed_frames.push(history.data().with_column_names(prefixed.clone())?);
            symbols.push(SymbolColumns {
                symbol: symbol.to_string(),
                original,
                prefixed,
            });
        }

        // Outer join on the index union, then trim so the dataset starts and
        // ends where every symbol has complete data.
        let data = trim_nan_rows(&Frame::outer_concat(&prefixed_frames)?);
        if data.len() < 2 {
            return Err(DatasetError::InsufficientRows {
                needed: 2,
                have: data.len(),
            });
        }

        let x = data.slice(0..data.len() - 1);
        let y = data
            .select(&target_columns)?
            .slice(1..data.len())
            .with_index(x.index().to_vec())?;

        Ok(Self {
            symbols,
            target_columns,
            n_time_steps,
            data,
            x,
            y,
        })
    }

    pub fn x(&self) -> &Frame {
        &self.x
    }

    pub fn y(&self) -> &Frame {
        &self.y
    }

    /// The joined pre-split table (`x` plus the final row).
    pub fn data(&self) -> &Frame {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn n_time_steps(&self) -> usize {
        self.n_time_steps
    }

    pub fn n_features(&self) -> usize {
        self.x.width()
    }

    pub fn n_symbols(&self) -> usize {
        self.target_columns.len()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.symbols.iter().map(|s| s.symbol.as_str()).collect()
    }

    pub fn target_columns(&self) -> &[String] {
        &self.target_columns
    }

    /// Project one symbol's feature columns back out of `x`, un-prefixed.
    pub fn history(&self, symbol: &str) -> Result<PriceHistory, DatasetError> {
        let record = self
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| DatasetError::UnknownSymbol(symbol.to_string()))?;
        let frame = self
            .x
            .select(&record.prefixed)?
            .with_column_names(record.original.clone())?;
        Ok(PriceHistory::new(symbol, frame)?)
    }

    /// Structurally independent copy with the same column schema and
    /// replaced rows. Partitioning and scaling go through here so schema
    /// bookkeeping is never duplicated.
    pub fn swap_data(&self, new_x: Frame, new_y: Option<Frame>) -> Result<Self, DatasetError> {
        let same_columns = |a: &Frame, b: &Frame| {
            a.columns().iter().collect::<BTreeSet<_>>() == b.columns().iter().collect::<BTreeSet<_>>()
        };
        if !same_columns(&self.x, &new_x) {
            return Err(DatasetError::ColumnMismatch);
        }
        let y = match new_y {
            Some(new_y) => {
                if !same_columns(&self.y, &new_y) {
                    return Err(DatasetError::ColumnMismatch);
                }
                new_y
            }
            None => self.y.clone(),
        };
        Ok(Self {
            symbols: self.symbols.clone(),
            target_columns: self.target_columns.clone(),
            n_time_steps: self.n_time_steps,
            data: new_x.clone(),
            x: new_x,
            y,
        })
    }

    /// Partition by trailing durations: test takes the last `test_duration`
    /// of the range, validation the `valid_duration` before it, train the
    /// rest. Partitions are disjoint and contiguous; concatenated they
    /// reconstruct `x` exactly. With `scaled`, a scaler is fitted on the
    /// train partition only and applied to all three.
    pub fn train_valid_test_split(
        &self,
        valid_duration: Duration,
        test_duration: Duration,
        scaled: bool,
    ) -> Result<DatasetSplit, DatasetError> {
        if self.x.is_empty() {
            return Err(DatasetError::InsufficientTrainingData);
        }
        let index = self.x.index();
        let end = index[index.len() - 1];
        let end_train = end - test_duration - valid_duration;
        let end_valid = end - test_duration;
        if end_train <= index[0] {
            return Err(DatasetError::InsufficientTrainingData);
        }

        let train_rows = index.partition_point(|ts| *ts <= end_train);
        let valid_rows = index.partition_point(|ts| *ts <= end_valid);

        let slice = |range: std::ops::Range<usize>| {
            self.swap_data(self.x.slice(range.clone()), Some(self.y.slice(range)))
        };
        let mut train = slice(0..train_rows)?;
        let mut valid = slice(train_rows..valid_rows)?;
        let mut test = slice(valid_rows..index.len())?;

        let mut scaler = None;
        if scaled {
            let fitted = train.fit_scaler();
            train = train.apply_scaler(&fitted)?;
            valid = valid.apply_scaler(&fitted)?;
            test = test.apply_scaler(&fitted)?;
            scaler = Some(fitted);
        }

        Ok(DatasetSplit {
            train,
            valid,
            test,
            scaler,
        })
    }

    /// Fit a standard scaler on this dataset's `x`.
    pub fn fit_scaler(&self) -> Scaler {
        Scaler::fit(&self.x)
    }

    /// Apply a fitted scaler to `x` and the joined table. Targets are left
    /// in raw units.
    pub fn apply_scaler(&self, scaler: &Scaler) -> Result<Self, DatasetError> {
        let x = scaler.transform(&self.x)?;
        let data = scaler.transform(&self.data)?;
        Ok(Self {
            symbols: self.symbols.clone(),
            target_columns: self.target_columns.clone(),
            n_time_steps: self.n_time_steps,
            data,
            x,
            y: self.y.clone(),
        })
    }

    /// Row positions eligible as window decision points: a full lookback
    /// window must exist, and unless `trade_market_open` is set, the window
    /// must also start at or after its session open so it never straddles
    /// the overnight boundary.
    pub fn get_batchable_index(
        &self,
        trade_market_open: bool,
        calendar: &dyn MarketCalendar,
    ) -> Vec<usize> {
        let lookback = Duration::minutes(self.n_time_steps as i64);
        (self.n_time_steps..self.x.len())
            .filter(|&position| {
                if trade_market_open {
                    return true;
                }
                let ts = self.x.index()[position];
                match calendar.session_open(ts) {
                    Some(open) => ts >= open + lookback,
                    None => false,
                }
            })
            .collect()
    }

    /// Deterministic BLAKE3 digest over symbols, index, and values.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for record in &self.symbols {
            hasher.update(record.symbol.as_bytes());
        }
        for frame in [&self.x, &self.y] {
            for ts in frame.index() {
                hasher.update(&ts.timestamp_micros().to_le_bytes());
            }
            for (position, name) in frame.columns().iter().enumerate() {
                hasher.update(name.as_bytes());
                for value in frame.column_at(position) {
                    hasher.update(&value.to_le_bytes());
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Read and optionally transform each symbol, then join them into a dataset.
///
/// Per-symbol work is read-only and independent, so it fans out across
/// symbols in parallel.
pub fn read_stock_dataset(
    symbols: &[&str],
    data_dir: &Path,
    target_column: &str,
    n_time_steps: usize,
    transform: Option<&TransformConfig>,
) -> Result<StockDataset, DatasetError> {
    let histories: Vec<PriceHistory> = symbols
        .par_iter()
        .map(|symbol| -> Result<PriceHistory, DatasetError> {
            let history = read_price_history(symbol, data_dir)?;
            match transform {
                Some(config) => Ok(history.transform(config)?),
                None => Ok(history),
            }
        })
        .collect::<Result<Vec<_>, DatasetError>>()?;
    StockDataset::new(histories, target_column, n_time_steps)
}
