//! Items, the unit of work that moves through the pipeline.
//!
//! An item's payload, workflow list, admission time, and value estimate are
//! fixed when it is admitted. Only its status changes, and only forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of an item. Ordered: a status never moves backwards.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
  New,
  Processing,
  Completed,
}

impl ItemStatus {
  /// The only status this one may move to, if any.
  pub fn successor(self) -> Option<Self> {
    match self {
      Self::New => Some(Self::Processing),
      Self::Processing => Some(Self::Completed),
      Self::Completed => None,
    }
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// The opaque message content carried by an item. Copied verbatim from the
/// template it was built from; the pipeline never inspects it beyond reading
/// one entity for activity events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
  pub sender:   String,
  pub subject:  String,
  #[serde(default)]
  pub preview:  String,
  pub intent:   String,
  #[serde(default)]
  pub entities: Map<String, Value>,
}

impl Payload {
  /// Look up a string-valued entity, e.g. `"student"`.
  pub fn entity_str(&self, key: &str) -> Option<&str> {
    self.entities.get(key).and_then(Value::as_str)
  }
}

/// A reusable description of an inbound message. Items are stamped out of
/// templates at admission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
  #[serde(flatten)]
  pub payload:        Payload,
  pub workflows:      Vec<String>,
  pub value_estimate: f64,
}

// ─── Item ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub id:             Uuid,
  #[serde(flatten)]
  pub payload:        Payload,
  pub workflows:      Vec<String>,
  pub status:         ItemStatus,
  pub admitted_at:    DateTime<Utc>,
  pub value_estimate: f64,
}

impl Item {
  /// Build a fresh `NEW` item from a template with a new id and the current
  /// time.
  pub fn from_template(template: &Template) -> Self {
    Self {
      id:             Uuid::new_v4(),
      payload:        template.payload.clone(),
      workflows:      template.workflows.clone(),
      status:         ItemStatus::New,
      admitted_at:    Utc::now(),
      value_estimate: template.value_estimate,
    }
  }

  /// Move the item to `next`, which must be the direct successor of its
  /// current status.
  pub fn advance(&mut self, next: ItemStatus) -> Result<()> {
    if self.status.successor() != Some(next) {
      return Err(Error::InvalidTransition {
        id:   self.id,
        from: self.status,
        to:   next,
      });
    }
    self.status = next;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn template() -> Template {
    Template {
      payload:        Payload {
        sender:   "Lisa Thompson".into(),
        subject:  "Reading progress".into(),
        preview:  String::new(),
        intent:   "PROGRESS_INQUIRY".into(),
        entities: json!({ "student": "Jake Thompson" })
          .as_object()
          .cloned()
          .unwrap(),
      },
      workflows:      vec!["PULL_READING_SCORES".into(), "DRAFT_RESPONSE".into()],
      value_estimate: 12.0,
    }
  }

  #[test]
  fn from_template_starts_new() {
    let item = Item::from_template(&template());
    assert_eq!(item.status, ItemStatus::New);
    assert_eq!(item.workflows.len(), 2);
    assert_eq!(item.payload.entity_str("student"), Some("Jake Thompson"));
  }

  #[test]
  fn advance_walks_forward_once() {
    let mut item = Item::from_template(&template());
    item.advance(ItemStatus::Processing).unwrap();
    item.advance(ItemStatus::Completed).unwrap();
    assert!(item.advance(ItemStatus::Completed).is_err());
  }

  #[test]
  fn advance_rejects_skips_and_regressions() {
    let mut item = Item::from_template(&template());
    assert!(matches!(
      item.advance(ItemStatus::Completed),
      Err(Error::InvalidTransition { .. })
    ));
    item.advance(ItemStatus::Processing).unwrap();
    assert!(item.advance(ItemStatus::New).is_err());
  }

  #[test]
  fn item_serialises_payload_flat() {
    let item = Item::from_template(&template());
    let v = serde_json::to_value(&item).unwrap();
    assert_eq!(v["status"], "NEW");
    assert_eq!(v["sender"], "Lisa Thompson");
    assert_eq!(v["entities"]["student"], "Jake Thompson");
  }
}
