//! [`RedisBus`], the Redis pub/sub implementation of [`Transport`].
//!
//! One multiplexed connection publishes; each subscription gets its own
//! pub/sub connection, which is re-established in the background if it drops.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use redis::{AsyncCommands as _, aio::MultiplexedConnection};
use sluice_core::transport::{Topic, Transport, TransportError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::Result;

/// Buffer between the pub/sub reader task and the subscriber.
const INBOUND_CAPACITY: usize = 1000;

/// Delay between attempts to re-establish a dropped subscription.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// A [`Transport`] backed by Redis pub/sub.
pub struct RedisBus {
  client:    redis::Client,
  publisher: MultiplexedConnection,
}

impl RedisBus {
  /// Connect to the Redis server at `url`.
  ///
  /// Fails if the URL is malformed or the server cannot be reached.
  pub async fn open(url: &str) -> Result<Self> {
    let client = redis::Client::open(url)?;
    let publisher = client.get_multiplexed_async_connection().await?;
    info!("connected to redis");
    Ok(Self { client, publisher })
  }

  async fn open_subscription(
    client: &redis::Client,
    topics: &[Topic],
  ) -> Result<redis::aio::PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    for topic in topics {
      pubsub.subscribe(topic.as_str()).await?;
    }
    Ok(pubsub)
  }
}

#[async_trait]
impl Transport for RedisBus {
  async fn publish(
    &self,
    topic: Topic,
    payload: Vec<u8>,
  ) -> Result<(), TransportError> {
    let mut conn = self.publisher.clone();
    conn.publish::<_, _, ()>(topic.as_str(), payload).await?;
    Ok(())
  }

  async fn subscribe(
    &self,
    topics: &[Topic],
  ) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
    // The first subscription is made up front so connection errors surface
    // to the caller; later drops are retried in the background.
    let first = Self::open_subscription(&self.client, topics).await?;
    let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
    tokio::spawn(read_messages(
      self.client.clone(),
      topics.to_vec(),
      first,
      tx,
    ));
    Ok(rx)
  }
}

async fn read_messages(
  client: redis::Client,
  topics: Vec<Topic>,
  first: redis::aio::PubSub,
  tx: mpsc::Sender<Vec<u8>>,
) {
  let mut pubsub = Some(first);
  loop {
    let conn = match pubsub.take() {
      Some(conn) => conn,
      None => {
        tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        if tx.is_closed() {
          break;
        }
        match RedisBus::open_subscription(&client, &topics).await {
          Ok(conn) => {
            info!("redis subscription re-established");
            conn
          }
          Err(e) => {
            warn!(error = %e, "failed to resubscribe to redis");
            continue;
          }
        }
      }
    };

    let mut messages = conn.into_on_message();
    while let Some(msg) = messages.next().await {
      if tx.send(msg.get_payload_bytes().to_vec()).await.is_err() {
        debug!("redis subscriber dropped");
        return;
      }
    }
    warn!("redis subscription dropped");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  #[tokio::test]
  async fn malformed_url_is_rejected() {
    let result = RedisBus::open("not a redis url").await;
    assert!(matches!(result, Err(Error::Redis(_))));
  }

  #[tokio::test]
  async fn unreachable_server_is_reported() {
    // Port 1 is reserved and never runs redis.
    let result = RedisBus::open("redis://127.0.0.1:1/").await;
    assert!(result.is_err());
  }
}
