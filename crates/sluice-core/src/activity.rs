//! Activity events, one record per completed workflow step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record that a workflow ran for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
  pub id:             Uuid,
  pub workflow:       String,
  pub item_id:        Uuid,
  /// The entity the workflow acted on (e.g. a student name), when the
  /// item's payload names one.
  pub subject_entity: Option<String>,
  pub timestamp:      DateTime<Utc>,
}

impl ActivityEvent {
  pub fn new(
    workflow: impl Into<String>,
    item_id: Uuid,
    subject_entity: Option<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      workflow: workflow.into(),
      item_id,
      subject_entity,
      timestamp: Utc::now(),
    }
  }
}
