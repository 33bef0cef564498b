//! Pipeline events: the transient records pushed to observers.
//!
//! Events are never stored. On the wire each one is a `{"type", "data"}`
//! record whose `type` is the SCREAMING_SNAKE_CASE variant name.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  activity::ActivityEvent,
  item::Item,
  metrics::{Metrics, PipelineCounts},
  transport::Topic,
};

/// Catch-up state delivered to a newly connected observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
  pub metrics:    Metrics,
  pub pipeline:   PipelineCounts,
  /// The most recent items, oldest first.
  pub items:      Vec<Item>,
  /// The most recent activity events, oldest first.
  pub activities: Vec<ActivityEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineEvent {
  InitialState(InitialState),
  /// An item was admitted.
  NewItem(Item),
  /// Pipeline counts changed as an item started processing.
  PipelineUpdate {
    pipeline:                PipelineCounts,
    active_processing_count: u64,
  },
  /// An item finished one pipeline stage.
  ProcessingStage {
    item_id:  Uuid,
    stage:    String,
    /// 1-based position of the stage.
    progress: usize,
    total:    usize,
  },
  WorkflowExecuted(ActivityEvent),
  ItemCompleted {
    item_id:  Uuid,
    value:    f64,
    metrics:  Metrics,
    pipeline: PipelineCounts,
  },
  /// Every store was cleared; observers should drop what they hold.
  Reset {
    metrics:  Metrics,
    pipeline: PipelineCounts,
  },
}

impl PipelineEvent {
  /// The wire name of this event's `type` field.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InitialState(_) => "INITIAL_STATE",
      Self::NewItem(_) => "NEW_ITEM",
      Self::PipelineUpdate { .. } => "PIPELINE_UPDATE",
      Self::ProcessingStage { .. } => "PROCESSING_STAGE",
      Self::WorkflowExecuted(_) => "WORKFLOW_EXECUTED",
      Self::ItemCompleted { .. } => "ITEM_COMPLETED",
      Self::Reset { .. } => "RESET",
    }
  }

  /// The cross-instance topic this event is replicated on. `INITIAL_STATE`
  /// is per-observer and never replicated.
  pub fn topic(&self) -> Option<Topic> {
    match self {
      Self::InitialState(_) => None,
      Self::NewItem(_) | Self::WorkflowExecuted(_) | Self::ItemCompleted { .. } => {
        Some(Topic::ItemUpdates)
      }
      Self::PipelineUpdate { .. } | Self::ProcessingStage { .. } => {
        Some(Topic::PipelineUpdates)
      }
      Self::Reset { .. } => Some(Topic::MetricUpdates),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wire_format_is_type_and_data() {
    let id = Uuid::new_v4();
    let event = PipelineEvent::ProcessingStage {
      item_id:  id,
      stage:    "PARSING".into(),
      progress: 2,
      total:    4,
    };
    let v = serde_json::to_value(&event).unwrap();
    assert_eq!(v["type"], "PROCESSING_STAGE");
    assert_eq!(v["data"]["stage"], "PARSING");
    assert_eq!(v["data"]["progress"], 2);
    assert_eq!(v["data"]["item_id"], id.to_string());

    let back: PipelineEvent = serde_json::from_value(v).unwrap();
    assert_eq!(back, event);
  }

  #[test]
  fn kind_matches_serialised_type() {
    let event = PipelineEvent::PipelineUpdate {
      pipeline:                PipelineCounts::default(),
      active_processing_count: 0,
    };
    let v = serde_json::to_value(&event).unwrap();
    assert_eq!(v["type"], event.kind());
  }

  #[test]
  fn initial_state_is_not_replicated() {
    let event = PipelineEvent::InitialState(InitialState {
      metrics:    Metrics::from_baseline(&Default::default()),
      pipeline:   PipelineCounts::default(),
      items:      vec![],
      activities: vec![],
    });
    assert_eq!(event.topic(), None);
  }
}
