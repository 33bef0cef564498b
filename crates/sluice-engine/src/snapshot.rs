//! Durable snapshot sync.
//!
//! Mirrors the two cumulative counters and the completed items into a
//! [`DurableStore`]. Storage failures are logged and otherwise ignored: the
//! in-memory ledger is the source of truth.
//!
//! Every write goes through one writer task in the order it was queued. A
//! wipe queued by a reset therefore lands after every completion queued
//! before it, and nothing from before the reset can reappear after it.

use std::sync::Arc;

use sluice_core::{
  item::Item,
  metrics::{Metrics, MetricsBaseline},
  store::{
    COMPLETED_ITEMS_LIST, CUMULATIVE_VALUE_KEY, CUMULATIVE_WORKFLOW_COUNT_KEY,
    DurableStore,
  },
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

enum Op {
  Persist {
    value: String,
    count: String,
    item:  Option<Item>,
  },
  Clear(oneshot::Sender<()>),
  Flush(oneshot::Sender<()>),
}

pub struct SnapshotSync<S> {
  store: Arc<S>,
  ops:   mpsc::UnboundedSender<Op>,
}

impl<S> Clone for SnapshotSync<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), ops: self.ops.clone() }
  }
}

impl<S> SnapshotSync<S>
where
  S: DurableStore + 'static,
{
  /// Wrap `store` and start its writer task. Must be called inside a tokio
  /// runtime. The writer stops once every clone has been dropped.
  pub fn new(store: Arc<S>) -> Self {
    let (ops, rx) = mpsc::unbounded_channel();
    tokio::spawn(write(store.clone(), rx));
    Self { store, ops }
  }

  /// Overwrite the cumulative counters in `baseline` with whatever was
  /// persisted. Missing or unreadable values leave the baseline as is.
  pub async fn restore(&self, baseline: &mut MetricsBaseline) {
    match self.read(CUMULATIVE_VALUE_KEY).await {
      Some(v) => baseline.cumulative_value = v,
      None => info!("no saved cumulative value; starting from baseline"),
    }
    match self.read(CUMULATIVE_WORKFLOW_COUNT_KEY).await {
      Some(v) => baseline.cumulative_workflow_count = v,
      None => info!("no saved workflow count; starting from baseline"),
    }
  }

  /// Queue the counters and the completed item for writing. Never waits.
  pub fn persist_completion(&self, metrics: &Metrics, item: Option<Item>) {
    let op = Op::Persist {
      value: metrics.cumulative_value.to_string(),
      count: metrics.cumulative_workflow_count.to_string(),
      item,
    };
    if self.ops.send(op).is_err() {
      warn!("durable writer stopped; completion not persisted");
    }
  }

  /// Queue a wipe of durable storage behind every write queued so far.
  ///
  /// The returned receiver resolves once the wipe has been attempted, and
  /// errors if the writer has stopped.
  pub fn clear(&self) -> oneshot::Receiver<()> {
    let (done, rx) = oneshot::channel();
    // On failure `done` is dropped and the receiver reports it.
    let _ = self.ops.send(Op::Clear(done));
    rx
  }

  /// Wait until every write queued so far has been attempted.
  pub async fn flush(&self) {
    let (done, rx) = oneshot::channel();
    if self.ops.send(Op::Flush(done)).is_err() || rx.await.is_err() {
      debug!("durable writer already stopped");
    }
  }

  async fn read<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
    match self.store.get(key).await {
      Ok(Some(raw)) => match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
          warn!(key, raw = %raw, "ignoring unparseable snapshot value");
          None
        }
      },
      Ok(None) => None,
      Err(e) => {
        warn!(key, error = %e, "failed to read snapshot value");
        None
      }
    }
  }
}

// ─── Writer task ─────────────────────────────────────────────────────────────

async fn write<S: DurableStore>(store: Arc<S>, mut ops: mpsc::UnboundedReceiver<Op>) {
  while let Some(op) = ops.recv().await {
    match op {
      Op::Persist { value, count, item } => {
        persist(&*store, value, count, item).await;
      }
      Op::Clear(done) => {
        if let Err(e) = store.clear().await {
          warn!(error = %e, "failed to clear durable storage");
        }
        let _ = done.send(());
      }
      Op::Flush(done) => {
        let _ = done.send(());
      }
    }
  }
  debug!("durable writer stopped");
}

async fn persist<S: DurableStore>(
  store: &S,
  value: String,
  count: String,
  item: Option<Item>,
) {
  if let Err(e) = store.set(CUMULATIVE_VALUE_KEY, value).await {
    warn!(error = %e, "failed to persist cumulative value");
  }
  if let Err(e) = store.set(CUMULATIVE_WORKFLOW_COUNT_KEY, count).await {
    warn!(error = %e, "failed to persist workflow count");
  }
  let Some(item) = item else { return };
  match serde_json::to_string(&item) {
    Ok(json) => {
      if let Err(e) = store.append(COMPLETED_ITEMS_LIST, json).await {
        warn!(item = %item.id, error = %e, "failed to persist completed item");
      }
    }
    Err(e) => warn!(item = %item.id, error = %e, "failed to encode completed item"),
  }
}
