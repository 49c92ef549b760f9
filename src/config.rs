//! Pipeline configuration loaded from an optional YAML file.
//!
//! Everything has a sensible default; a config file only overrides the
//! knobs it names.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cardinality::DEFAULT_CARDINALITY_LIMIT;
use crate::retention::RetentionPolicy;

/// Errors that can occur when loading the pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading the config file.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// YAML parsing error.
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Tunables of the metrics pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum distinct label combinations per metric.
    pub cardinality_limit: usize,
    /// Per-tier retention ages.
    pub retention: RetentionPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cardinality_limit: DEFAULT_CARDINALITY_LIMIT,
            retention: RetentionPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Parameters
    ///
    /// - `path` - Path to the YAML config file
    ///
    /// # Returns
    ///
    /// Returns `Ok(PipelineConfig)` on success.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}
