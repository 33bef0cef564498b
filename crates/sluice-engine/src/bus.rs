//! In-process [`Transport`] for running several engines inside one process.
//!
//! Every clone of a [`LocalBus`] shares one broadcast channel, so two hubs
//! attached to clones of the same bus replicate to each other the way two
//! servers sharing a message broker would.

use sluice_core::transport::{Topic, Transport, TransportError};
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

const SUBSCRIBER_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct LocalBus {
  tx: broadcast::Sender<(Topic, Vec<u8>)>,
}

impl LocalBus {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }
}

impl Default for LocalBus {
  fn default() -> Self { Self::new(1024) }
}

#[async_trait::async_trait]
impl Transport for LocalBus {
  async fn publish(
    &self,
    topic: Topic,
    payload: Vec<u8>,
  ) -> Result<(), TransportError> {
    // No subscribers is not an error for pub/sub.
    let _ = self.tx.send((topic, payload));
    Ok(())
  }

  async fn subscribe(
    &self,
    topics: &[Topic],
  ) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
    let mut rx = self.tx.subscribe();
    let topics = topics.to_vec();
    let (tx, out) = mpsc::channel(SUBSCRIBER_CAPACITY);

    tokio::spawn(async move {
      loop {
        match rx.recv().await {
          Ok((topic, payload)) => {
            if topics.contains(&topic) && tx.send(payload).await.is_err() {
              break;
            }
          }
          Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!(skipped = n, "local bus subscriber lagged");
          }
          Err(broadcast::error::RecvError::Closed) => break,
        }
      }
    });

    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn subscriber_sees_only_its_topics_in_order() {
    let bus = LocalBus::default();
    let mut rx = bus
      .subscribe(&[Topic::ItemUpdates, Topic::PipelineUpdates])
      .await
      .unwrap();

    bus.publish(Topic::ItemUpdates, b"1".to_vec()).await.unwrap();
    bus.publish(Topic::MetricUpdates, b"x".to_vec()).await.unwrap();
    bus.publish(Topic::PipelineUpdates, b"2".to_vec()).await.unwrap();
    bus.publish(Topic::ItemUpdates, b"3".to_vec()).await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), b"1");
    assert_eq!(rx.recv().await.unwrap(), b"2");
    assert_eq!(rx.recv().await.unwrap(), b"3");
  }
}
