//! Wiring for the Sluice server binary.
//!
//! [`ServerConfig`] is what `config.toml` and `SLUICE_*` environment
//! variables deserialise into; [`app`] mounts the API under `/api` with
//! request tracing.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use sluice_core::{metrics::MetricsBaseline, store::DurableStore};
use sluice_engine::{
  EngineConfig, Hub,
  config::{GeneratorConfig, PipelineConfig},
};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// Enables cross-instance replication when set.
  pub redis_url:           Option<String>,
  /// JSON array of templates; the built-in set is used when unset.
  pub templates_path:      Option<PathBuf>,
  pub pipeline:            PipelineConfig,
  pub generator:           GeneratorConfig,
  pub metrics:             MetricsBaseline,
  pub observer_queue:      usize,
  pub catch_up_items:      usize,
  pub catch_up_activities: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let engine = EngineConfig::default();
    Self {
      host:                "0.0.0.0".to_string(),
      port:                3001,
      store_path:          PathBuf::from("sluice.db"),
      redis_url:           None,
      templates_path:      None,
      pipeline:            engine.pipeline,
      generator:           engine.generator,
      metrics:             engine.metrics,
      observer_queue:      engine.observer_queue,
      catch_up_items:      engine.catch_up_items,
      catch_up_activities: engine.catch_up_activities,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// The engine half of the configuration.
  pub fn engine(&self) -> EngineConfig {
    EngineConfig {
      pipeline:            self.pipeline.clone(),
      generator:           self.generator.clone(),
      metrics:             self.metrics.clone(),
      observer_queue:      self.observer_queue,
      catch_up_items:      self.catch_up_items,
      catch_up_activities: self.catch_up_activities,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level router for `hub`.
pub fn app<S>(hub: Arc<Hub<S>>) -> Router
where
  S: DurableStore + 'static,
{
  Router::new()
    .nest("/api", sluice_api::api_router(hub))
    .layer(TraceLayer::new_for_http())
}
