//! Read-only query handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/metrics` | Current metrics aggregate |
//! | `GET`  | `/pipeline` | Incoming / processing / completed counts |
//! | `GET`  | `/items` | Optional `?window=N` (default 20) |
//! | `GET`  | `/activities` | Optional `?window=N` (default 50) |
//! | `GET`  | `/health` | Uptime, observers, active processing, queue depth |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use sluice_core::{
  activity::ActivityEvent,
  item::Item,
  metrics::{Metrics, PipelineCounts},
  store::DurableStore,
};
use sluice_engine::{Health, Hub};

use crate::error::ApiError;

const DEFAULT_ITEM_WINDOW: usize = 20;
const DEFAULT_ACTIVITY_WINDOW: usize = 50;
/// Largest window a single request may ask for.
pub const MAX_WINDOW: usize = 1000;

#[derive(Debug, Deserialize, Default)]
pub struct WindowParams {
  pub window: Option<usize>,
}

impl WindowParams {
  fn resolve(&self, default: usize) -> Result<usize, ApiError> {
    match self.window {
      None => Ok(default),
      Some(n) if n > MAX_WINDOW => Err(ApiError::BadRequest(format!(
        "window must be at most {MAX_WINDOW}, got {n}"
      ))),
      Some(n) => Ok(n),
    }
  }
}

/// `GET /metrics`
pub async fn metrics<S>(State(hub): State<Arc<Hub<S>>>) -> Json<Metrics>
where
  S: DurableStore + 'static,
{
  Json(hub.metrics())
}

/// `GET /pipeline`
pub async fn pipeline<S>(State(hub): State<Arc<Hub<S>>>) -> Json<PipelineCounts>
where
  S: DurableStore + 'static,
{
  Json(hub.pipeline())
}

/// `GET /items[?window=N]`, oldest first.
pub async fn items<S>(
  State(hub): State<Arc<Hub<S>>>,
  Query(params): Query<WindowParams>,
) -> Result<Json<Vec<Item>>, ApiError>
where
  S: DurableStore + 'static,
{
  let window = params.resolve(DEFAULT_ITEM_WINDOW)?;
  Ok(Json(hub.recent_items(window)))
}

/// `GET /activities[?window=N]`, oldest first.
pub async fn activities<S>(
  State(hub): State<Arc<Hub<S>>>,
  Query(params): Query<WindowParams>,
) -> Result<Json<Vec<ActivityEvent>>, ApiError>
where
  S: DurableStore + 'static,
{
  let window = params.resolve(DEFAULT_ACTIVITY_WINDOW)?;
  Ok(Json(hub.recent_activities(window)))
}

/// `GET /health`
pub async fn health<S>(State(hub): State<Arc<Hub<S>>>) -> Json<Health>
where
  S: DurableStore + 'static,
{
  Json(hub.health())
}
