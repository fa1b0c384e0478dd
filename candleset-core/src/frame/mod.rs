//! Time-indexed column table.
//!
//! `Frame` is the substrate every pipeline stage operates on: an ordered
//! timestamp index plus named `f64` columns stored column-major. Missing
//! observations are plain IEEE NaN, so gap handling stays a value-level
//! concern rather than an `Option` at every call site. All operations
//! return a new `Frame`; nothing mutates in place.

pub mod trim;

pub use trim::trim_nan_rows;

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("{columns} column names given for {series} value series")]
    ColumnCountMismatch { columns: usize, series: usize },

    #[error("column {column} has {len} values for {rows} index rows")]
    ShapeMismatch {
        column: String,
        len: usize,
        rows: usize,
    },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("replacement index has {new} entries for {rows} rows")]
    IndexLengthMismatch { new: usize, rows: usize },
}

/// Ordered, time-indexed table of named `f64` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: Vec<DateTime<Utc>>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl Frame {
    /// Build a frame from an index, column names, and one value series per column.
    pub fn new(
        index: Vec<DateTime<Utc>>,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, FrameError> {
        if columns.len() != values.len() {
            return Err(FrameError::ColumnCountMismatch {
                columns: columns.len(),
                series: values.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for (name, series) in columns.iter().zip(&values) {
            if !seen.insert(name.as_str()) {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
            if series.len() != index.len() {
                return Err(FrameError::ShapeMismatch {
                    column: name.clone(),
                    len: series.len(),
                    rows: index.len(),
                });
            }
        }
        Ok(Self {
            index,
            columns,
            values,
        })
    }

    // Shapes already validated by the caller.
    pub(crate) fn new_unchecked(
        index: Vec<DateTime<Utc>>,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        debug_assert!(values.iter().all(|v| v.len() == index.len()));
        Self {
            index,
            columns,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_position(name).map(|p| self.values[p].as_slice())
    }

    pub fn try_column(&self, name: &str) -> Result<&[f64], FrameError> {
        self.column(name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))
    }

    /// Column values by position, in `columns()` order.
    pub fn column_at(&self, position: usize) -> &[f64] {
        &self.values[position]
    }

    pub fn get(&self, row: usize, name: &str) -> Option<f64> {
        self.column(name).and_then(|c| c.get(row).copied())
    }

    pub fn row_has_nan(&self, row: usize) -> bool {
        self.values.iter().any(|c| c[row].is_nan())
    }

    pub fn index_strictly_increasing(&self) -> bool {
        self.index.windows(2).all(|w| w[0] < w[1])
    }

    /// Contiguous row slice, same columns.
    pub fn slice(&self, rows: Range<usize>) -> Frame {
        Frame::new_unchecked(
            self.index[rows.clone()].to_vec(),
            self.columns.clone(),
            self.values.iter().map(|c| c[rows.clone()].to_vec()).collect(),
        )
    }

    /// Project the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Frame, FrameError> {
        let mut columns = Vec::with_capacity(names.len());
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            if columns.contains(name) {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
            let position = self
                .column_position(name)
                .ok_or_else(|| FrameError::MissingColumn(name.clone()))?;
            columns.push(name.clone());
            values.push(self.values[position].clone());
        }
        Ok(Frame::new_unchecked(self.index.clone(), columns, values))
    }

    /// Drop the named columns; every name must exist.
    pub fn drop_columns(&self, names: &[&str]) -> Result<Frame, FrameError> {
        for name in names {
            if !self.has_column(name) {
                return Err(FrameError::MissingColumn(name.to_string()));
            }
        }
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (name, series) in self.columns.iter().zip(&self.values) {
            if !names.contains(&name.as_str()) {
                columns.push(name.clone());
                values.push(series.clone());
            }
        }
        Ok(Frame::new_unchecked(self.index.clone(), columns, values))
    }

    /// Replace every column name, positionally.
    pub fn with_column_names(&self, names: Vec<String>) -> Result<Frame, FrameError> {
        if names.len() != self.columns.len() {
            return Err(FrameError::ColumnCountMismatch {
                columns: names.len(),
                series: self.columns.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Frame::new_unchecked(
            self.index.clone(),
            names,
            self.values.clone(),
        ))
    }

    /// Replace the index labels without touching any values.
    pub fn with_index(&self, index: Vec<DateTime<Utc>>) -> Result<Frame, FrameError> {
        if index.len() != self.len() {
            return Err(FrameError::IndexLengthMismatch {
                new: index.len(),
                rows: self.len(),
            });
        }
        Ok(Frame::new_unchecked(
            index,
            self.columns.clone(),
            self.values.clone(),
        ))
    }

    /// Replace an existing column's values.
    pub fn with_column(&self, name: &str, series: Vec<f64>) -> Result<Frame, FrameError> {
        let position = self
            .column_position(name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))?;
        if series.len() != self.len() {
            return Err(FrameError::ShapeMismatch {
                column: name.to_string(),
                len: series.len(),
                rows: self.len(),
            });
        }
        let mut values = self.values.clone();
        values[position] = series;
        Ok(Frame::new_unchecked(
            self.index.clone(),
            self.columns.clone(),
            values,
        ))
    }

    /// Append a new column on the same index.
    pub fn append_column(&self, name: String, series: Vec<f64>) -> Result<Frame, FrameError> {
        if self.has_column(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        if series.len() != self.len() {
            return Err(FrameError::ShapeMismatch {
                column: name,
                len: series.len(),
                rows: self.len(),
            });
        }
        let mut columns = self.columns.clone();
        let mut values = self.values.clone();
        columns.push(name);
        values.push(series);
        Ok(Frame::new_unchecked(self.index.clone(), columns, values))
    }

    /// Re-point the frame onto a new timestamp set. Rows absent from the
    /// original index come back as all-NaN; rows absent from `new_index`
    /// are dropped.
    pub fn reindex(&self, new_index: &[DateTime<Utc>]) -> Frame {
        let lookup: HashMap<DateTime<Utc>, usize> =
            self.index.iter().copied().zip(0..).collect();
        let values = self
            .values
            .iter()
            .map(|series| {
                new_index
                    .iter()
                    .map(|ts| lookup.get(ts).map_or(f64::NAN, |&row| series[row]))
                    .collect()
            })
            .collect();
        Frame::new_unchecked(new_index.to_vec(), self.columns.clone(), values)
    }

    /// Column-wise outer join across frames on the union of their indices.
    /// Column names must be globally unique.
    pub fn outer_concat(frames: &[Frame]) -> Result<Frame, FrameError> {
        let mut union = BTreeSet::new();
        for frame in frames {
            union.extend(frame.index.iter().copied());
        }
        let index: Vec<DateTime<Utc>> = union.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        let mut values: Vec<Vec<f64>> = Vec::new();
        for frame in frames {
            let aligned = frame.reindex(&index);
            for (name, series) in aligned.columns.into_iter().zip(aligned.values) {
                if columns.contains(&name) {
                    return Err(FrameError::DuplicateColumn(name));
                }
                columns.push(name);
                values.push(series);
            }
        }
        Ok(Frame::new_unchecked(index, columns, values))
    }
}
