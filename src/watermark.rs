//! Persisted rollup cursor.
//!
//! The rollup job records the last wall-clock time it fully incorporated
//! into rollups in a small JSON state file. The file is read at the start
//! of each pass and rewritten only after a pass completes without error,
//! so a failed pass reprocesses the same window on the next tick. Absence
//! of the file is not an error: the first run falls back to a fixed
//! look-back window.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

/// Look-back applied when no state file exists yet (1 hour).
pub const DEFAULT_LOOKBACK_SECS: i64 = 60 * 60;

/// On-disk shape of the state file. Timestamps are RFC3339 strings.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    last_processed_time: String,
    last_run: String,
}

/// Reader/writer for the rollup watermark file.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    /// Create a watermark store over the given file path.
    ///
    /// # Parameters
    ///
    /// - `path` - Location of the JSON state file; created on first advance
    ///
    /// # Returns
    ///
    /// Returns a new `WatermarkStore`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Load the last processed time, in unix seconds.
    ///
    /// A missing or unreadable file yields `now - DEFAULT_LOOKBACK_SECS`;
    /// a corrupt file is logged and treated the same way.
    ///
    /// # Parameters
    ///
    /// - `now` - Current wall-clock time, unix seconds
    ///
    /// # Returns
    ///
    /// Returns the watermark to roll up from.
    pub fn load(&self, now: i64) -> i64 {
        let fallback = now - DEFAULT_LOOKBACK_SECS;
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return fallback,
            Err(err) => {
                warn!("failed to read watermark file {:?}: {err}", self.path);
                return fallback;
            }
        };

        let state: StateFile = match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(err) => {
                warn!("corrupt watermark file {:?}: {err}", self.path);
                return fallback;
            }
        };

        match OffsetDateTime::parse(&state.last_processed_time, &Rfc3339) {
            Ok(ts) => ts.unix_timestamp(),
            Err(err) => {
                warn!("invalid watermark timestamp in {:?}: {err}", self.path);
                fallback
            }
        }
    }

    /// Persist a completed pass.
    ///
    /// # Parameters
    ///
    /// - `last_processed_time` - Wall-clock captured at the start of the
    ///   pass, unix seconds
    /// - `last_run` - Wall-clock at pass completion, unix seconds
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` when the state file was written.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be written.
    pub fn advance(&self, last_processed_time: i64, last_run: i64) -> io::Result<()> {
        let state = StateFile {
            last_processed_time: format_rfc3339(last_processed_time)?,
            last_run: format_rfc3339(last_run)?,
        };
        let json = serde_json::to_string_pretty(&state)?;
        fs::write(&self.path, json)
    }
}

/// Format unix seconds as an RFC3339 string.
fn format_rfc3339(timestamp: i64) -> io::Result<String> {
    let dt = OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    dt.format(&Rfc3339).map_err(io::Error::other)
}
