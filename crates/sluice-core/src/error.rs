//! Error types for `sluice-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::item::ItemStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("item {id} cannot move from {from:?} to {to:?}")]
  InvalidTransition {
    id:   Uuid,
    from: ItemStatus,
    to:   ItemStatus,
  },

  #[error("item {0} must be NEW to be admitted")]
  NotNew(Uuid),

  #[error("unknown topic: {0:?}")]
  UnknownTopic(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
