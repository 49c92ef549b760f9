//! Application state shared across HTTP handlers.

use std::io;
use std::sync::Arc;

use crate::anomaly::AnomalyDetector;
use crate::cardinality::CardinalityGuard;
use crate::config::PipelineConfig;
use crate::query::QueryRouter;
use crate::store::MetricStore;

/// Application state shared across all HTTP handlers.
///
/// All components wrap the same store; the pipeline has no other shared
/// in-process state.
#[derive(Clone)]
pub struct AppState {
    /// Backing metric store.
    pub store: Arc<dyn MetricStore>,
    /// Admission gate applied before raw ingestion.
    pub guard: CardinalityGuard,
    /// Tier-routing query engine.
    pub router: QueryRouter,
    /// Z-score detector over raw ranges.
    pub detector: AnomalyDetector,
    /// Effective pipeline configuration.
    pub config: PipelineConfig,
}

impl AppState {
    /// Create application state from a store and configuration.
    ///
    /// # Parameters
    ///
    /// - `store` - Storage implementation shared by every component
    /// - `config` - Effective pipeline configuration
    ///
    /// # Returns
    ///
    /// Returns configured `AppState` with initialized components.
    pub fn new(store: Arc<dyn MetricStore>, config: PipelineConfig) -> Self {
        let guard = CardinalityGuard::new(store.clone(), config.cardinality_limit);
        let router = QueryRouter::new(store.clone());
        let detector = AnomalyDetector::new(store.clone());
        Self { store, guard, router, detector, config }
    }

    /// Get a builder for configuring application state step by step.
    ///
    /// # Returns
    ///
    /// Returns an `AppStateBuilder` for fluent configuration.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for constructing `AppState` with a fluent interface.
#[derive(Default)]
pub struct AppStateBuilder {
    store: Option<Arc<dyn MetricStore>>,
    config: Option<PipelineConfig>,
}

impl AppStateBuilder {
    /// Set the storage implementation.
    ///
    /// # Parameters
    ///
    /// - `store` - Storage implementation to use
    ///
    /// # Returns
    ///
    /// Returns the builder for method chaining.
    pub fn with_store(mut self, store: Arc<dyn MetricStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the pipeline configuration.
    ///
    /// # Parameters
    ///
    /// - `config` - Configuration to use instead of the defaults
    ///
    /// # Returns
    ///
    /// Returns the builder for method chaining.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the final `AppState`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(AppState)` when a store was provided.
    ///
    /// # Errors
    ///
    /// Returns an error if no store was configured.
    pub fn build(self) -> io::Result<AppState> {
        let store = self
            .store
            .ok_or(io::Error::new(io::ErrorKind::InvalidInput, "Store is required for AppState"))?;
        Ok(AppState::new(store, self.config.unwrap_or_default()))
    }
}
