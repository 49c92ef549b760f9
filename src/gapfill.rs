//! Gap filling for charting.
//!
//! Charts want a point at every grid step. This module walks a regular
//! interval grid over a range and aligns already-sorted input points to
//! it, substituting nulls where no sample lies close enough.

use serde::Serialize;

use crate::query::DataPoint;

/// A grid-aligned point; `value` is `None` where no sample matched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilledPoint {
    pub timestamp: i64,
    pub value: Option<f64>,
}

/// Produce a regular-interval sequence over `[start, end]`.
///
/// Walks the grid `t = start, start+interval, ...` while `t <= end`. At
/// each step the next unconsumed input point is emitted when its timestamp
/// lies within half an interval of `t`; otherwise a null point at `t` is
/// emitted. Each input point is consumed at most once, in order. Output
/// length is `(end - start) / interval + 1`. Empty input produces empty
/// output: there is nothing to align against.
///
/// # Parameters
///
/// - `points` - Input points, already ordered by timestamp
/// - `start` - Grid start, unix seconds
/// - `end` - Grid end, unix seconds (inclusive)
/// - `interval_seconds` - Grid step, must be positive
///
/// # Returns
///
/// Returns the grid-aligned sequence.
pub fn fill(points: &[DataPoint], start: i64, end: i64, interval_seconds: i64) -> Vec<FilledPoint> {
    if points.is_empty() || interval_seconds <= 0 {
        return Vec::new();
    }

    let mut filled = Vec::new();
    let mut cursor = 0;
    let mut t = start;
    while t <= end {
        match points.get(cursor) {
            Some(point) if (point.timestamp - t).abs() * 2 < interval_seconds => {
                filled.push(FilledPoint { timestamp: point.timestamp, value: Some(point.value) });
                cursor += 1;
            }
            _ => filled.push(FilledPoint { timestamp: t, value: None }),
        }
        t += interval_seconds;
    }
    filled
}
