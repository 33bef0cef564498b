//! JSON REST API and live event stream for Sluice.
//!
//! Exposes an axum [`Router`] backed by a shared [`Hub`]. TLS, CORS, and
//! static assets are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", sluice_api::api_router(hub.clone()))
//! ```

pub mod analytics;
pub mod control;
pub mod error;
pub mod live;
pub mod query;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use sluice_core::store::DurableStore;
use sluice_engine::Hub;

pub use error::ApiError;

/// Build a fully-materialised API router for `hub`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(hub: Arc<Hub<S>>) -> Router<()>
where
  S: DurableStore + 'static,
{
  Router::new()
    // Queries
    .route("/metrics", get(query::metrics::<S>))
    .route("/pipeline", get(query::pipeline::<S>))
    .route("/items", get(query::items::<S>))
    .route("/activities", get(query::activities::<S>))
    .route("/health", get(query::health::<S>))
    .route("/analytics", get(analytics::handler::<S>))
    // Control
    .route("/simulate", post(control::simulate::<S>))
    .route("/demo/start", post(control::start_demo::<S>))
    .route("/demo/stop", post(control::stop_demo::<S>))
    .route("/reset", post(control::reset::<S>))
    // Live stream
    .route("/live", get(live::handler::<S>))
    .with_state(hub)
}
