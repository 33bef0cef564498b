//! Fan-out of pipeline events to observers and peer instances.
//!
//! Locally, every observer owns a bounded queue. Publishing tries each queue
//! once: a full queue drops the event for that observer, a closed queue
//! removes the observer. Nothing here ever waits on an observer.
//!
//! Remotely, a single forwarder task drains an ordered outbound queue onto
//! the [`Transport`], and a single listener task delivers events received
//! from peers to local observers only. Each envelope carries the id of the
//! instance that produced it; an instance ignores its own echoes.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak},
};

use sluice_core::{
  event::{InitialState, PipelineEvent},
  transport::{Envelope, Topic, Transport},
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Error, Result};

/// Capacity of the queue feeding the cross-instance forwarder.
const OUTBOUND_CAPACITY: usize = 1024;

type Frame = Arc<PipelineEvent>;

// ─── Observer ────────────────────────────────────────────────────────────────

/// The receiving end of one observer registration.
pub struct Observer {
  id:     Uuid,
  events: mpsc::Receiver<Frame>,
}

impl Observer {
  pub fn id(&self) -> Uuid { self.id }

  /// Wait for the next event. Returns `None` once the observer has been
  /// disconnected and its queue drained.
  pub async fn recv(&mut self) -> Option<Frame> { self.events.recv().await }

  /// Take the next event if one is already queued.
  pub fn try_recv(&mut self) -> Option<Frame> { self.events.try_recv().ok() }
}

// ─── Fabric ──────────────────────────────────────────────────────────────────

pub struct Fabric {
  instance_id:    Uuid,
  queue_capacity: usize,
  observers:      Mutex<HashMap<Uuid, mpsc::Sender<Frame>>>,
  outbound:       OnceLock<mpsc::Sender<Frame>>,
  shutdown:       CancellationToken,
}

impl Fabric {
  pub fn new(queue_capacity: usize) -> Self {
    Self {
      instance_id: Uuid::new_v4(),
      queue_capacity: queue_capacity.max(1),
      observers: Mutex::new(HashMap::new()),
      outbound: OnceLock::new(),
      shutdown: CancellationToken::new(),
    }
  }

  pub fn instance_id(&self) -> Uuid { self.instance_id }

  pub fn observer_count(&self) -> usize { self.lock_observers().len() }

  /// Register an observer whose first event is `initial`.
  ///
  /// The initial state is queued under the registry lock, so no published
  /// event can reach the observer ahead of it.
  pub fn connect(&self, initial: InitialState) -> Observer {
    let (tx, rx) = mpsc::channel(self.queue_capacity);
    let id = Uuid::new_v4();

    let mut observers = self.lock_observers();
    // Capacity is at least one and the queue is fresh.
    let _ = tx.try_send(Arc::new(PipelineEvent::InitialState(initial)));
    observers.insert(id, tx);
    info!(observer = %id, total = observers.len(), "observer connected");

    Observer { id, events: rx }
  }

  /// Remove an observer. Safe to call more than once.
  pub fn disconnect(&self, id: Uuid) {
    let mut observers = self.lock_observers();
    if observers.remove(&id).is_some() {
      info!(observer = %id, total = observers.len(), "observer disconnected");
    }
  }

  /// Deliver `event` to local observers and forward it to peer instances.
  pub fn publish(&self, event: PipelineEvent) {
    let frame = Arc::new(event);
    self.deliver_local(&frame);

    let Some(outbound) = self.outbound.get() else { return };
    if frame.topic().is_none() {
      return;
    }
    match outbound.try_send(frame) {
      Ok(()) => {}
      Err(TrySendError::Full(frame)) => {
        warn!(kind = frame.kind(), "outbound queue full; event not replicated");
      }
      Err(TrySendError::Closed(_)) => {
        debug!("outbound forwarder stopped");
      }
    }
  }

  /// Deliver `frame` to local observers only.
  pub fn deliver_local(&self, frame: &Frame) {
    let mut observers = self.lock_observers();
    observers.retain(|id, tx| match tx.try_send(frame.clone()) {
      Ok(()) => true,
      Err(TrySendError::Full(_)) => {
        debug!(observer = %id, kind = frame.kind(), "observer queue full; event dropped");
        true
      }
      Err(TrySendError::Closed(_)) => {
        info!(observer = %id, "observer went away");
        false
      }
    });
  }

  /// Start replicating through `transport`.
  ///
  /// Subscribes to every topic before returning, then spawns the forwarder
  /// and listener tasks. Attaching a second transport is an error.
  pub async fn attach(
    self: &Arc<Self>,
    transport: Arc<dyn Transport>,
  ) -> Result<()> {
    if self.outbound.get().is_some() {
      return Err(Error::Config("a transport is already attached".into()));
    }
    let inbound = transport
      .subscribe(&Topic::ALL)
      .await
      .map_err(Error::Transport)?;

    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    if self.outbound.set(tx).is_err() {
      return Err(Error::Config("a transport is already attached".into()));
    }

    tokio::spawn(forward(
      self.instance_id,
      transport,
      rx,
      self.shutdown.clone(),
    ));
    tokio::spawn(listen(Arc::downgrade(self), inbound, self.shutdown.clone()));
    info!(instance = %self.instance_id, "cross-instance replication enabled");
    Ok(())
  }

  /// Stop the replication tasks. Local delivery keeps working.
  pub fn shutdown(&self) { self.shutdown.cancel(); }

  fn lock_observers(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<Frame>>> {
    self.observers.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

// ─── Replication tasks ───────────────────────────────────────────────────────

async fn forward(
  origin: Uuid,
  transport: Arc<dyn Transport>,
  mut outbound: mpsc::Receiver<Frame>,
  shutdown: CancellationToken,
) {
  loop {
    let frame = tokio::select! {
      _ = shutdown.cancelled() => break,
      frame = outbound.recv() => match frame {
        Some(frame) => frame,
        None => break,
      },
    };
    let Some(topic) = frame.topic() else { continue };

    let envelope = Envelope { origin, event: PipelineEvent::clone(&frame) };
    let payload = match envelope.encode() {
      Ok(payload) => payload,
      Err(e) => {
        warn!(error = %e, "failed to encode envelope");
        continue;
      }
    };
    if let Err(e) = transport.publish(topic, payload).await {
      warn!(%topic, error = %e, "failed to replicate event");
    }
  }
  debug!("outbound forwarder stopped");
}

async fn listen(
  fabric: Weak<Fabric>,
  mut inbound: mpsc::Receiver<Vec<u8>>,
  shutdown: CancellationToken,
) {
  loop {
    let bytes = tokio::select! {
      _ = shutdown.cancelled() => break,
      bytes = inbound.recv() => match bytes {
        Some(bytes) => bytes,
        None => {
          warn!("transport subscription ended");
          break;
        }
      },
    };
    let Some(fabric) = fabric.upgrade() else { break };

    let envelope = match Envelope::decode(&bytes) {
      Ok(envelope) => envelope,
      Err(e) => {
        warn!(error = %e, "discarding undecodable envelope");
        continue;
      }
    };
    if envelope.origin == fabric.instance_id {
      continue;
    }
    if envelope.event.topic().is_none() {
      debug!(kind = envelope.event.kind(), "ignoring non-replicated event");
      continue;
    }
    fabric.deliver_local(&Arc::new(envelope.event));
  }
  debug!("inbound listener stopped");
}
