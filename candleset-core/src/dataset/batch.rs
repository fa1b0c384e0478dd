//! Window sampling into model-ready tensors.
//!
//! A batch element is anchored at a decision point `p`: the input window is
//! rows `[p - n_time_steps, p)` of `x` and the target is row `p - 1` of `y`
//! (already shifted one step ahead of `x`, so that row is the realized
//! outcome of the step ending at `p - 1`). Consumers rely on this index
//! relationship exactly.

use super::{DatasetError, StockDataset};
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::Rng;

/// One sampled batch: inputs `(batch, n_time_steps, n_features)`, targets
/// `(batch, n_symbols)`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Array3<f64>,
    pub y: Array2<f64>,
}

/// Two temporally adjacent samples per batch element: `second` is anchored
/// one step after `first`.
#[derive(Debug, Clone)]
pub struct PairedBatch {
    pub first: Batch,
    pub second: Batch,
}

impl StockDataset {
    /// Sample a batch of lookback windows.
    ///
    /// With `shuffle`, decision points are drawn independently from
    /// `eligible` (with or without replacement); otherwise one contiguous
    /// run of `batch_size` consecutive eligible positions starts at a
    /// uniformly random offset.
    pub fn get_batch(
        &self,
        batch_size: usize,
        eligible: &[usize],
        shuffle: bool,
        replace: bool,
        rng: &mut StdRng,
    ) -> Result<Batch, DatasetError> {
        let positions = self.sample_positions(batch_size, eligible, shuffle, replace, rng)?;
        self.window_batch(&positions)
    }

    /// As `get_batch`, but each element also carries the sample anchored at
    /// the following position. The final eligible index has no successor and
    /// is excluded from the pool.
    pub fn get_paired_batch(
        &self,
        batch_size: usize,
        eligible: &[usize],
        shuffle: bool,
        replace: bool,
        rng: &mut StdRng,
    ) -> Result<PairedBatch, DatasetError> {
        if eligible.len() < 2 {
            return Err(DatasetError::NoEligiblePositions);
        }
        let pool = &eligible[..eligible.len() - 1];
        let positions = self.sample_positions(batch_size, pool, shuffle, replace, rng)?;
        let successors: Vec<usize> = positions.iter().map(|p| p + 1).collect();
        Ok(PairedBatch {
            first: self.window_batch(&positions)?,
            second: self.window_batch(&successors)?,
        })
    }

    /// The most recent `n_time_steps` rows of the joined (pre-split) table
    /// as a single-element input batch, for live inference.
    pub fn prediction_x(&self, n_time_steps: usize) -> Result<Array3<f64>, DatasetError> {
        let data = self.data();
        if data.len() < n_time_steps {
            return Err(DatasetError::InsufficientRows {
                needed: n_time_steps,
                have: data.len(),
            });
        }
        let start = data.len() - n_time_steps;
        let mut x = Array3::<f64>::zeros((1, n_time_steps, data.width()));
        for (feature, _) in data.columns().iter().enumerate() {
            let series = data.column_at(feature);
            for step in 0..n_time_steps {
                x[[0, step, feature]] = series[start + step];
            }
        }
        Ok(x)
    }

    fn sample_positions(
        &self,
        batch_size: usize,
        eligible: &[usize],
        shuffle: bool,
        replace: bool,
        rng: &mut StdRng,
    ) -> Result<Vec<usize>, DatasetError> {
        if eligible.is_empty() {
            return Err(DatasetError::NoEligiblePositions);
        }
        if shuffle {
            if replace {
                return Ok((0..batch_size)
                    .map(|_| eligible[rng.gen_range(0..eligible.len())])
                    .collect());
            }
            if batch_size > eligible.len() {
                return Err(DatasetError::BatchExceedsEligible {
                    requested: batch_size,
                    available: eligible.len(),
                });
            }
            let drawn = rand::seq::index::sample(rng, eligible.len(), batch_size);
            return Ok(drawn.iter().map(|i| eligible[i]).collect());
        }

        if batch_size > eligible.len() {
            return Err(DatasetError::BatchExceedsEligible {
                requested: batch_size,
                available: eligible.len(),
            });
        }
        let offset = rng.gen_range(0..=eligible.len() - batch_size);
        Ok(eligible[offset..offset + batch_size].to_vec())
    }

    fn window_batch(&self, positions: &[usize]) -> Result<Batch, DatasetError> {
        let n = self.n_time_steps();
        let rows = self.x().len();
        for &position in positions {
            if position < n || position > rows {
                return Err(DatasetError::PositionOutOfRange {
                    position,
                    min: n,
                    max: rows,
                });
            }
        }

        let mut x = Array3::<f64>::zeros((positions.len(), n, self.n_features()));
        let mut y = Array2::<f64>::zeros((positions.len(), self.n_symbols()));
        for (element, &position) in positions.iter().enumerate() {
            let start = position - n;
            for feature in 0..self.n_features() {
                let series = self.x().column_at(feature);
                for step in 0..n {
                    x[[element, step, feature]] = series[start + step];
                }
            }
            for symbol in 0..self.n_symbols() {
                y[[element, symbol]] = self.y().column_at(symbol)[position - 1];
            }
        }
        Ok(Batch { x, y })
    }
}
