//! Rollup windows and time-bucket alignment.
//!
//! Every tier summarizes fixed-size, window-aligned intervals. This module
//! maps timestamps to the start of their containing bucket and enumerates
//! the buckets covering a range. Timestamps are unix seconds, UTC.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A downsampling resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Window {
    /// 1 minute buckets
    #[serde(rename = "1m")]
    Minutes1,
    /// 5 minute buckets
    #[serde(rename = "5m")]
    Minutes5,
    /// 1 hour buckets
    #[serde(rename = "1h")]
    Hours1,
}

/// All configured windows, finest first. The rollup pass processes them in
/// this order.
pub const ALL_WINDOWS: [Window; 3] = [Window::Minutes1, Window::Minutes5, Window::Hours1];

impl Window {
    /// Duration of one bucket in seconds.
    pub const fn duration_secs(self) -> i64 {
        match self {
            Self::Minutes1 => 60,
            Self::Minutes5 => 5 * 60,
            Self::Hours1 => 60 * 60,
        }
    }

    /// Canonical window name as used in the API and storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minutes1 => "1m",
            Self::Minutes5 => "5m",
            Self::Hours1 => "1h",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Window {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::Minutes1),
            "5m" => Ok(Self::Minutes5),
            "1h" => Ok(Self::Hours1),
            other => Err(PipelineError::InvalidWindow(other.to_string())),
        }
    }
}

/// Align a timestamp down to the start of its containing bucket.
///
/// # Parameters
///
/// - `timestamp` - Unix timestamp in seconds
/// - `window` - Bucket resolution
///
/// # Returns
///
/// Returns the largest window multiple that is ≤ `timestamp`.
pub fn bucket_start(timestamp: i64, window: Window) -> i64 {
    let secs = window.duration_secs();
    timestamp.div_euclid(secs) * secs
}

/// Enumerate the buckets covering `[start, end)`.
///
/// The sequence begins at `bucket_start(start)` and steps by one window
/// while the bucket start is before `end`; the last bucket may extend past
/// `end`. Pure function of its inputs.
///
/// # Parameters
///
/// - `start` - Range start, unix seconds
/// - `end` - Range end, unix seconds
/// - `window` - Bucket resolution
///
/// # Returns
///
/// Returns ordered `(bucket_start, bucket_end)` pairs; empty when
/// `end <= bucket_start(start)`.
pub fn buckets(start: i64, end: i64, window: Window) -> Vec<(i64, i64)> {
    let secs = window.duration_secs();
    let mut out = Vec::new();
    let mut current = bucket_start(start, window);
    while current < end {
        out.push((current, current + secs));
        current += secs;
    }
    out
}
