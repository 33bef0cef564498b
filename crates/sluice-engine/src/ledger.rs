//! The ledger: all shared mutable engine state behind one lock.
//!
//! Metrics, pipeline counts, the item store, and the activity log change
//! together, so they live in a single [`LedgerState`] guarded by one mutex.
//! Any snapshot taken under that lock is internally consistent: the active
//! processing count always equals the number of `PROCESSING` items.

use std::{
  collections::VecDeque,
  sync::{Mutex, MutexGuard, PoisonError},
};

use sluice_core::{
  activity::ActivityEvent,
  event::InitialState,
  item::{Item, ItemStatus},
  metrics::{Metrics, MetricsBaseline, PipelineCounts},
};
use uuid::Uuid;

pub struct Ledger {
  state: Mutex<LedgerState>,
}

impl Ledger {
  pub fn new(baseline: MetricsBaseline, history_limit: usize) -> Self {
    Self { state: Mutex::new(LedgerState::new(baseline, history_limit)) }
  }

  /// Run `f` with exclusive access to the state.
  ///
  /// `f` must not block or await; it runs while every other writer waits.
  pub fn transact<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
    f(&mut self.lock())
  }

  pub fn metrics(&self) -> Metrics { self.lock().metrics.clone() }

  pub fn pipeline(&self) -> PipelineCounts { self.lock().pipeline }

  pub fn recent_items(&self, n: usize) -> Vec<Item> {
    self.lock().recent_items(n)
  }

  pub fn recent_activities(&self, n: usize) -> Vec<ActivityEvent> {
    self.lock().recent_activities(n)
  }

  // A panic inside `transact` leaves the counters as they were at the last
  // completed write, so a poisoned lock is still usable.
  fn lock(&self) -> MutexGuard<'_, LedgerState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

// ─── State ───────────────────────────────────────────────────────────────────

pub struct LedgerState {
  metrics:       Metrics,
  pipeline:      PipelineCounts,
  items:         VecDeque<Item>,
  activities:    VecDeque<ActivityEvent>,
  baseline:      MetricsBaseline,
  history_limit: usize,
  /// Bumped by every reset. Runs admitted under an older epoch no longer
  /// own anything in the ledger.
  epoch:         u64,
}

impl LedgerState {
  fn new(baseline: MetricsBaseline, history_limit: usize) -> Self {
    Self {
      metrics: Metrics::from_baseline(&baseline),
      pipeline: PipelineCounts::default(),
      items: VecDeque::new(),
      activities: VecDeque::new(),
      baseline,
      history_limit,
      epoch: 0,
    }
  }

  pub fn epoch(&self) -> u64 { self.epoch }

  pub fn metrics(&self) -> &Metrics { &self.metrics }

  pub fn pipeline(&self) -> PipelineCounts { self.pipeline }

  /// Append a `NEW` item and count it as queued. Returns the epoch the
  /// item's run belongs to.
  pub fn admit(&mut self, item: Item) -> u64 {
    self.metrics.enqueue();
    self.pipeline.enqueue();
    self.items.push_back(item);
    self.trim_items();
    self.epoch
  }

  /// Move an item from the queue into processing.
  pub fn begin(&mut self, id: Uuid) {
    self.advance(id, ItemStatus::Processing);
    self.metrics.begin_processing();
    self.pipeline.begin_processing();
  }

  pub fn record_activity(&mut self, activity: ActivityEvent) {
    self.activities.push_back(activity);
    while self.activities.len() > self.history_limit {
      self.activities.pop_front();
    }
  }

  /// Move an item out of processing, credit its value and workflows, and
  /// return the completed item.
  pub fn complete(&mut self, id: Uuid, value: f64, workflows: usize) -> Option<Item> {
    let item = self.advance(id, ItemStatus::Completed);
    self.metrics.finish_processing(value, workflows);
    self.pipeline.finish_processing();
    self.trim_items();
    item
  }

  /// Clear both logs, zero the counters, and start a new epoch.
  pub fn reset(&mut self) {
    self.metrics = Metrics::zeroed(&self.baseline);
    self.pipeline = PipelineCounts::default();
    self.items.clear();
    self.activities.clear();
    self.epoch += 1;
  }

  pub fn recent_items(&self, n: usize) -> Vec<Item> {
    let skip = self.items.len().saturating_sub(n);
    self.items.iter().skip(skip).cloned().collect()
  }

  pub fn recent_activities(&self, n: usize) -> Vec<ActivityEvent> {
    let skip = self.activities.len().saturating_sub(n);
    self.activities.iter().skip(skip).cloned().collect()
  }

  pub fn catch_up(&self, items: usize, activities: usize) -> InitialState {
    InitialState {
      metrics:    self.metrics.clone(),
      pipeline:   self.pipeline,
      items:      self.recent_items(items),
      activities: self.recent_activities(activities),
    }
  }

  fn advance(&mut self, id: Uuid, next: ItemStatus) -> Option<Item> {
    // Live items sit near the back.
    let item = self.items.iter_mut().rev().find(|i| i.id == id)?;
    if let Err(e) = item.advance(next) {
      tracing::warn!(item = %id, error = %e, "item status not advanced");
    }
    Some(item.clone())
  }

  /// Drop the oldest completed items past the history limit. Items still in
  /// flight are never dropped.
  fn trim_items(&mut self) {
    while self.items.len() > self.history_limit
      && self
        .items
        .front()
        .is_some_and(|i| i.status == ItemStatus::Completed)
    {
      self.items.pop_front();
    }
  }
}

#[cfg(test)]
mod tests {
  use sluice_core::item::{Payload, Template};

  use super::*;

  fn item(workflows: usize) -> Item {
    Item::from_template(&Template {
      payload:        Payload {
        sender:   "Robert Chen".into(),
        subject:  "Math test".into(),
        preview:  String::new(),
        intent:   "GRADE_INQUIRY".into(),
        entities: Default::default(),
      },
      workflows:      (0..workflows).map(|i| format!("WF_{i}")).collect(),
      value_estimate: 20.0,
    })
  }

  fn processing_items(state: &LedgerState) -> u64 {
    state
      .items
      .iter()
      .filter(|i| i.status == ItemStatus::Processing)
      .count() as u64
  }

  #[test]
  fn active_count_tracks_processing_items() {
    let ledger = Ledger::new(MetricsBaseline::default(), 100);
    let a = item(1);
    let b = item(2);
    let (a_id, b_id) = (a.id, b.id);

    ledger.transact(|s| {
      s.admit(a);
      s.admit(b);
      assert_eq!(s.metrics().queue_depth, 2);

      s.begin(a_id);
      s.begin(b_id);
      assert_eq!(s.metrics().active_processing_count, processing_items(s));
      assert_eq!(s.metrics().active_processing_count, 2);

      let done = s.complete(a_id, 20.0, 1).unwrap();
      assert_eq!(done.status, ItemStatus::Completed);
      assert_eq!(s.metrics().active_processing_count, processing_items(s));
      assert_eq!(s.pipeline().completed, 1);
    });
  }

  #[test]
  fn recent_windows_are_bounded_and_ordered() {
    let ledger = Ledger::new(MetricsBaseline::default(), 100);
    let ids: Vec<_> = (0..15)
      .map(|_| {
        let i = item(0);
        let id = i.id;
        ledger.transact(|s| s.admit(i));
        id
      })
      .collect();

    let recent = ledger.recent_items(10);
    assert_eq!(recent.len(), 10);
    assert_eq!(recent.first().unwrap().id, ids[5]);
    assert_eq!(recent.last().unwrap().id, ids[14]);
    assert_eq!(ledger.recent_items(50).len(), 15);
  }

  #[test]
  fn reset_clears_everything_and_bumps_epoch() {
    let ledger = Ledger::new(
      MetricsBaseline { cumulative_value: 47.3, ..Default::default() },
      100,
    );
    let i = item(1);
    let id = i.id;
    ledger.transact(|s| {
      let epoch = s.admit(i);
      s.begin(id);
      s.record_activity(ActivityEvent::new("WF_0", id, None));
      s.reset();
      assert_eq!(s.epoch(), epoch + 1);
    });

    let m = ledger.metrics();
    assert_eq!(m.cumulative_value, 0.0);
    assert_eq!(m.active_processing_count, 0);
    assert_eq!(m.queue_depth, 0);
    assert_eq!(ledger.pipeline(), PipelineCounts::default());
    assert!(ledger.recent_items(10).is_empty());
    assert!(ledger.recent_activities(10).is_empty());
  }

  #[test]
  fn trimming_never_drops_in_flight_items() {
    let ledger = Ledger::new(MetricsBaseline::default(), 2);
    let first = item(0);
    let first_id = first.id;
    ledger.transact(|s| {
      s.admit(first);
      s.begin(first_id);
      for _ in 0..3 {
        s.admit(item(0));
      }
    });
    let items = ledger.recent_items(10);
    assert_eq!(items.len(), 4);
    assert_eq!(items[0].id, first_id);

    ledger.transact(|s| s.complete(first_id, 0.0, 0));
    // The completed head is now eligible; the NEW items behind it are not.
    assert_eq!(ledger.recent_items(10).len(), 3);
  }
}
