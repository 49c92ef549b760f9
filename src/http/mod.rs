//! HTTP surface exposing the pipeline operations as JSON endpoints.

pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

pub use routes::build_router;
pub use state::AppState;
