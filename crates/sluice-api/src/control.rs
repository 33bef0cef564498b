//! Handlers that change engine state.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/simulate` | Admit one item from a random template |
//! | `POST` | `/demo/start` | `success: false` with 200 if already running |
//! | `POST` | `/demo/stop` | Idempotent |
//! | `POST` | `/reset` | Clears stores, counters, and durable storage |

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use sluice_core::store::DurableStore;
use sluice_engine::Hub;
use uuid::Uuid;

use crate::error::ApiError;

/// Body of every control response.
#[derive(Debug, Serialize)]
pub struct Outcome {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<&'static str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:   Option<&'static str>,
}

impl Outcome {
  fn ok(message: &'static str) -> Self {
    Self { success: true, message: Some(message), error: None }
  }

  fn refused(error: &'static str) -> Self {
    Self { success: false, message: None, error: Some(error) }
  }
}

#[derive(Debug, Serialize)]
pub struct Simulated {
  pub success: bool,
  pub item_id: Uuid,
  pub message: &'static str,
}

/// `POST /simulate`
pub async fn simulate<S>(
  State(hub): State<Arc<Hub<S>>>,
) -> Result<Json<Simulated>, ApiError>
where
  S: DurableStore + 'static,
{
  let item_id = hub.simulate()?;
  Ok(Json(Simulated {
    success: true,
    item_id,
    message: "item simulation started",
  }))
}

/// `POST /demo/start`
pub async fn start_demo<S>(
  State(hub): State<Arc<Hub<S>>>,
) -> Result<Json<Outcome>, ApiError>
where
  S: DurableStore + 'static,
{
  match hub.start_demo() {
    Ok(()) => Ok(Json(Outcome::ok("demo mode started"))),
    Err(sluice_engine::Error::AlreadyRunning) => {
      Ok(Json(Outcome::refused("demo already running")))
    }
    Err(e) => Err(e.into()),
  }
}

/// `POST /demo/stop`
pub async fn stop_demo<S>(State(hub): State<Arc<Hub<S>>>) -> Json<Outcome>
where
  S: DurableStore + 'static,
{
  hub.stop_demo();
  Json(Outcome::ok("demo mode stopped"))
}

/// `POST /reset`
pub async fn reset<S>(State(hub): State<Arc<Hub<S>>>) -> Json<Outcome>
where
  S: DurableStore + 'static,
{
  hub.reset().await;
  Json(Outcome::ok("system reset complete"))
}
