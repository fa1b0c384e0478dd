//! Feature-wise standardization.
//!
//! Fit once on a training matrix, apply by reference everywhere else —
//! validation, test, and live inference must never influence the fitted
//! parameters. Serializable so a live trader can reload the exact scaler
//! the model was trained with.

use crate::frame::Frame;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ScalerError {
    #[error("scaler fitted on columns {expected:?}, applied to {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Per-column zero-mean, unit-variance transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    columns: Vec<String>,
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Scaler {
    /// Fit per-column mean and population standard deviation.
    ///
    /// Zero-variance columns scale by 1.0 so constant features pass through
    /// centered instead of dividing by zero.
    pub fn fit(frame: &Frame) -> Self {
        let rows = frame.len();
        let mut mean = Vec::with_capacity(frame.width());
        let mut std = Vec::with_capacity(frame.width());
        for position in 0..frame.width() {
            let series = frame.column_at(position);
            if rows == 0 {
                mean.push(0.0);
                std.push(1.0);
                continue;
            }
            let m = series.iter().sum::<f64>() / rows as f64;
            let variance = series.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / rows as f64;
            let s = variance.sqrt();
            mean.push(m);
            std.push(if s == 0.0 { 1.0 } else { s });
        }
        Self {
            columns: frame.columns().to_vec(),
            mean,
            std,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// Standardize a matrix with the fitted parameters. The column schema
    /// must match the fit-time schema exactly, order included.
    pub fn transform(&self, frame: &Frame) -> Result<Frame, ScalerError> {
        if frame.columns() != self.columns.as_slice() {
            return Err(ScalerError::SchemaMismatch {
                expected: self.columns.clone(),
                found: frame.columns().to_vec(),
            });
        }
        let values = (0..frame.width())
            .map(|position| {
                let m = self.mean[position];
                let s = self.std[position];
                frame
                    .column_at(position)
                    .iter()
                    .map(|v| (v - m) / s)
                    .collect()
            })
            .collect();
        Ok(Frame::new_unchecked(
            frame.index().to_vec(),
            self.columns.clone(),
            values,
        ))
    }
}
