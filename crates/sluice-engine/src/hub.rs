//! [`Hub`], the single owned context every outer layer talks to.

use std::{sync::Arc, time::Instant};

use serde::Serialize;
use sluice_core::{
  activity::ActivityEvent,
  event::PipelineEvent,
  item::Item,
  metrics::{Metrics, PipelineCounts},
  store::DurableStore,
  transport::Transport,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  EngineConfig, Result,
  config::GeneratorConfig,
  fabric::{Fabric, Observer},
  generator::Generator,
  ledger::Ledger,
  pipeline::Engine,
  snapshot::SnapshotSync,
  templates::TemplatePool,
};

/// Liveness summary for `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
  pub status:                  &'static str,
  pub uptime_secs:             f64,
  pub observers:               usize,
  pub active_processing_count: u64,
  pub queue_depth:             u64,
}

pub struct Hub<S> {
  engine:              Engine<S>,
  generator:           Generator,
  generator_config:    GeneratorConfig,
  templates:           Arc<TemplatePool>,
  snapshot:            SnapshotSync<S>,
  catch_up_items:      usize,
  catch_up_activities: usize,
  started_at:          Instant,
}

impl<S> Hub<S>
where
  S: DurableStore + 'static,
{
  /// Validate `config`, seed the metrics from `store`, and build the hub.
  pub async fn new(
    config: EngineConfig,
    store: Arc<S>,
    templates: TemplatePool,
  ) -> Result<Self> {
    config.validate()?;

    let snapshot = SnapshotSync::new(store);
    let mut baseline = config.metrics.clone();
    snapshot.restore(&mut baseline).await;
    info!(
      cumulative_value = baseline.cumulative_value,
      cumulative_workflow_count = baseline.cumulative_workflow_count,
      "metrics seeded"
    );

    let ledger = Arc::new(Ledger::new(baseline, config.pipeline.history_limit));
    let fabric = Arc::new(Fabric::new(config.observer_queue));
    let engine = Engine::new(
      Arc::new(config.pipeline),
      ledger,
      fabric,
      snapshot.clone(),
    );

    Ok(Self {
      engine,
      generator: Generator::new(),
      generator_config: config.generator,
      templates: Arc::new(templates),
      snapshot,
      catch_up_items: config.catch_up_items,
      catch_up_activities: config.catch_up_activities,
      started_at: Instant::now(),
    })
  }

  /// Replicate events to and from peer instances through `transport`.
  pub async fn attach_transport(
    &self,
    transport: Arc<dyn Transport>,
  ) -> Result<()> {
    self.engine.fabric().attach(transport).await
  }

  pub fn instance_id(&self) -> Uuid { self.engine.fabric().instance_id() }

  // ── Admission ─────────────────────────────────────────────────────────

  pub fn admit(&self, item: Item) -> Result<Uuid> { self.engine.admit(item) }

  /// Admit one item built from a randomly chosen template.
  pub fn simulate(&self) -> Result<Uuid> {
    self.engine.admit(Item::from_template(self.templates.pick()))
  }

  // ── Observers ─────────────────────────────────────────────────────────

  /// Register an observer. Its first event is the catch-up state.
  pub fn connect(&self) -> Observer {
    // Taking the snapshot and registering under the ledger lock means no
    // state change can slip between the two.
    self.engine.ledger().transact(|state| {
      let initial =
        state.catch_up(self.catch_up_items, self.catch_up_activities);
      self.engine.fabric().connect(initial)
    })
  }

  pub fn disconnect(&self, id: Uuid) { self.engine.fabric().disconnect(id) }

  pub fn observer_count(&self) -> usize {
    self.engine.fabric().observer_count()
  }

  // ── Control ───────────────────────────────────────────────────────────

  pub fn start_demo(&self) -> Result<()> {
    self.generator.start(
      self.engine.clone(),
      self.templates.clone(),
      self.generator_config.clone(),
    )
  }

  /// Returns whether the generator was running.
  pub fn stop_demo(&self) -> bool { self.generator.stop() }

  pub fn demo_running(&self) -> bool { self.generator.is_running() }

  /// Clear every store, zero every counter, wipe durable storage, and tell
  /// every observer.
  pub async fn reset(&self) {
    let cleared = self.engine.ledger().transact(|state| {
      state.reset();
      self.engine.fabric().publish(PipelineEvent::Reset {
        metrics:  state.metrics().clone(),
        pipeline: state.pipeline(),
      });
      self.snapshot.clear()
    });
    info!("system reset");
    if cleared.await.is_err() {
      warn!("durable writer stopped; storage not cleared");
    }
  }

  /// Stop the generator and replication. In-flight runs finish on their own.
  pub fn shutdown(&self) {
    self.generator.stop();
    self.engine.fabric().shutdown();
  }

  /// Wait for every durable write queued so far.
  pub async fn flush(&self) { self.snapshot.flush().await }

  // ── Queries ───────────────────────────────────────────────────────────

  pub fn metrics(&self) -> Metrics { self.engine.ledger().metrics() }

  pub fn pipeline(&self) -> PipelineCounts { self.engine.ledger().pipeline() }

  pub fn recent_items(&self, n: usize) -> Vec<Item> {
    self.engine.ledger().recent_items(n)
  }

  pub fn recent_activities(&self, n: usize) -> Vec<ActivityEvent> {
    self.engine.ledger().recent_activities(n)
  }

  pub fn health(&self) -> Health {
    let metrics = self.metrics();
    Health {
      status:                  "healthy",
      uptime_secs:             self.started_at.elapsed().as_secs_f64(),
      observers:               self.observer_count(),
      active_processing_count: metrics.active_processing_count,
      queue_depth:             metrics.queue_depth,
    }
  }
}
