//! The cross-instance `Transport` capability.
//!
//! Instances replicate pipeline events to each other through a pub/sub
//! channel. The engine sees only this trait; message-bus crates (e.g.
//! `sluice-bus-redis`) implement it. The trait is object safe so an
//! instance can run with or without a transport behind an `Arc<dyn _>`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{Error, event::PipelineEvent};

pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

// ─── Topics ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
  ItemUpdates,
  MetricUpdates,
  PipelineUpdates,
}

impl Topic {
  pub const ALL: [Topic; 3] =
    [Topic::ItemUpdates, Topic::MetricUpdates, Topic::PipelineUpdates];

  pub fn as_str(self) -> &'static str {
    match self {
      Topic::ItemUpdates => "item-updates",
      Topic::MetricUpdates => "metric-updates",
      Topic::PipelineUpdates => "pipeline-updates",
    }
  }
}

impl fmt::Display for Topic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Topic {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Topic::ALL
      .into_iter()
      .find(|t| t.as_str() == s)
      .ok_or_else(|| Error::UnknownTopic(s.to_owned()))
  }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// What actually travels on the channel: the event plus the id of the
/// instance that produced it, so an instance can drop its own echoes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  pub origin: Uuid,
  pub event:  PipelineEvent,
}

impl Envelope {
  pub fn encode(&self) -> crate::Result<Vec<u8>> {
    Ok(serde_json::to_vec(self)?)
  }

  pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
    Ok(serde_json::from_slice(bytes)?)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
  /// Publish one payload on `topic`. Best effort; no delivery guarantee.
  async fn publish(
    &self,
    topic: Topic,
    payload: Vec<u8>,
  ) -> Result<(), TransportError>;

  /// Subscribe to every topic in `topics` over a single ordered stream.
  ///
  /// Payloads published in order by one producer arrive in that order,
  /// regardless of which of the subscribed topics they were sent on.
  async fn subscribe(
    &self,
    topics: &[Topic],
  ) -> Result<mpsc::Receiver<Vec<u8>>, TransportError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn topic_names_round_trip() {
    for topic in Topic::ALL {
      assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
    }
    assert!("email-updates".parse::<Topic>().is_err());
  }
}
