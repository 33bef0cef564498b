//! The pipeline engine. One independent run per admitted item.
//!
//! A run walks its item through every configured stage and then every
//! workflow on the item, sleeping the configured latency before each step.
//! Each step mutates the ledger and publishes its event inside the same
//! ledger transaction, so the order observers see matches the order of the
//! state changes. A run whose epoch was retired by a reset stops at its
//! next step without touching anything. Completions are queued for durable
//! storage inside the same transaction.

use std::sync::Arc;

use sluice_core::{
  activity::ActivityEvent,
  event::PipelineEvent,
  item::{Item, ItemStatus},
  store::DurableStore,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  config::PipelineConfig,
  fabric::Fabric,
  ledger::{Ledger, LedgerState},
  snapshot::SnapshotSync,
};

pub struct Engine<S> {
  config:   Arc<PipelineConfig>,
  ledger:   Arc<Ledger>,
  fabric:   Arc<Fabric>,
  snapshot: SnapshotSync<S>,
}

impl<S> Clone for Engine<S> {
  fn clone(&self) -> Self {
    Self {
      config:   self.config.clone(),
      ledger:   self.ledger.clone(),
      fabric:   self.fabric.clone(),
      snapshot: self.snapshot.clone(),
    }
  }
}

/// What a run needs to know about its item, copied out at admission.
struct RunPlan {
  item_id:        Uuid,
  workflows:      Vec<String>,
  value_estimate: f64,
  subject_entity: Option<String>,
  epoch:          u64,
}

impl<S> Engine<S>
where
  S: DurableStore + 'static,
{
  pub fn new(
    config: Arc<PipelineConfig>,
    ledger: Arc<Ledger>,
    fabric: Arc<Fabric>,
    snapshot: SnapshotSync<S>,
  ) -> Self {
    Self { config, ledger, fabric, snapshot }
  }

  pub fn ledger(&self) -> &Ledger { &self.ledger }

  pub fn fabric(&self) -> &Arc<Fabric> { &self.fabric }

  /// Admit a `NEW` item and start its run in the background.
  pub fn admit(&self, item: Item) -> Result<Uuid> {
    if item.status != ItemStatus::New {
      return Err(Error::Core(sluice_core::Error::NotNew(item.id)));
    }

    let mut plan = RunPlan {
      item_id:        item.id,
      workflows:      item.workflows.clone(),
      value_estimate: item.value_estimate,
      subject_entity: item
        .payload
        .entity_str(&self.config.subject_entity_key)
        .map(str::to_owned),
      epoch:          0,
    };

    plan.epoch = self.ledger.transact(|state| {
      let epoch = state.admit(item.clone());
      self.fabric.publish(PipelineEvent::NewItem(item));
      epoch
    });
    info!(item = %plan.item_id, workflows = plan.workflows.len(), "item admitted");

    let id = plan.item_id;
    tokio::spawn(self.clone().run(plan));
    Ok(id)
  }

  /// Items currently processing.
  pub fn active_processing(&self) -> u64 {
    self.ledger.metrics().active_processing_count
  }

  async fn run(self, plan: RunPlan) {
    let id = plan.item_id;

    let started = self.step(plan.epoch, |state| {
      state.begin(id);
      PipelineEvent::PipelineUpdate {
        pipeline:                state.pipeline(),
        active_processing_count: state.metrics().active_processing_count,
      }
    });
    if started.is_none() {
      return self.retire(id);
    }

    let total = self.config.stages.len();
    for (index, stage) in self.config.stages.iter().enumerate() {
      tokio::time::sleep(stage.latency()).await;
      let progressed = self.step(plan.epoch, |_| PipelineEvent::ProcessingStage {
        item_id:  id,
        stage:    stage.name.clone(),
        progress: index + 1,
        total,
      });
      if progressed.is_none() {
        return self.retire(id);
      }
      debug!(item = %id, stage = %stage.name, progress = index + 1, total, "stage done");
    }

    for workflow in &plan.workflows {
      tokio::time::sleep(self.config.workflow_latency()).await;
      let activity =
        ActivityEvent::new(workflow.as_str(), id, plan.subject_entity.clone());
      let executed = self.step(plan.epoch, |state| {
        state.record_activity(activity.clone());
        PipelineEvent::WorkflowExecuted(activity)
      });
      if executed.is_none() {
        return self.retire(id);
      }
    }

    let finished = self.step(plan.epoch, |state| {
      let completed =
        state.complete(id, plan.value_estimate, plan.workflows.len());
      // Queued under the ledger lock, so a later reset's wipe is queued
      // behind it.
      self.snapshot.persist_completion(state.metrics(), completed);
      PipelineEvent::ItemCompleted {
        item_id:  id,
        value:    plan.value_estimate,
        metrics:  state.metrics().clone(),
        pipeline: state.pipeline(),
      }
    });
    if finished.is_none() {
      return self.retire(id);
    }
    info!(item = %id, value = plan.value_estimate, "item completed");
  }

  /// Apply `f` and publish its event if the run's epoch is still current.
  /// Returns a copy of the published event.
  fn step(
    &self,
    epoch: u64,
    f: impl FnOnce(&mut LedgerState) -> PipelineEvent,
  ) -> Option<PipelineEvent> {
    self.ledger.transact(|state| {
      if state.epoch() != epoch {
        return None;
      }
      let event = f(state);
      self.fabric.publish(event.clone());
      Some(event)
    })
  }

  fn retire(&self, id: Uuid) {
    debug!(item = %id, "run retired by reset");
  }
}
