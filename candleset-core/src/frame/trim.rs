//! Leading/trailing incomplete-row removal.
//!
//! A row is complete when no column holds NaN. Trimming keeps the maximal
//! span from the first complete row to the last complete row, inclusive.
//! Incomplete rows in the interior are preserved.

use super::Frame;

/// Trim leading and trailing runs of rows that have at least one NaN.
///
/// An empty frame comes back unchanged; a frame where every row is
/// incomplete comes back with an empty index and the columns intact.
pub fn trim_nan_rows(frame: &Frame) -> Frame {
    if frame.is_empty() {
        return frame.clone();
    }

    let first = (0..frame.len()).find(|&row| !frame.row_has_nan(row));
    let Some(first) = first else {
        return frame.slice(0..0);
    };
    let last = (first..frame.len())
        .rev()
        .find(|&row| !frame.row_has_nan(row))
        .unwrap_or(first);

    frame.slice(first..last + 1)
}
