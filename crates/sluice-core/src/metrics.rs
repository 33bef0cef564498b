//! Aggregate metrics and pipeline counts.
//!
//! Both records are plain data. Callers hold them behind a lock and mutate
//! them through the methods here so paired counters always move together.

use serde::{Deserialize, Serialize};

// ─── Baseline ────────────────────────────────────────────────────────────────

/// Starting values for [`Metrics`]. The quality figures are reported verbatim
/// and never derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsBaseline {
  pub cumulative_value:          f64,
  pub cumulative_workflow_count: u64,
  pub success_rate:              f64,
  pub response_time:             f64,
  pub accuracy:                  f64,
}

impl Default for MetricsBaseline {
  fn default() -> Self {
    Self {
      cumulative_value:          0.0,
      cumulative_workflow_count: 0,
      success_rate:              98.7,
      response_time:             2.3,
      accuracy:                  98.7,
    }
  }
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
  /// Sum of `value_estimate` over every completed item.
  pub cumulative_value:          f64,
  pub cumulative_workflow_count: u64,
  /// Items currently in `PROCESSING`.
  pub active_processing_count:   u64,
  /// Items admitted whose run has not started yet.
  pub queue_depth:               u64,
  /// Value completed since the process started or was last reset.
  pub today_value:               f64,
  pub success_rate:              f64,
  pub response_time:             f64,
  pub accuracy:                  f64,
}

impl Metrics {
  pub fn from_baseline(baseline: &MetricsBaseline) -> Self {
    Self {
      cumulative_value:          baseline.cumulative_value,
      cumulative_workflow_count: baseline.cumulative_workflow_count,
      active_processing_count:   0,
      queue_depth:               0,
      today_value:               0.0,
      success_rate:              baseline.success_rate,
      response_time:             baseline.response_time,
      accuracy:                  baseline.accuracy,
    }
  }

  /// All counters at zero; quality figures kept from `baseline`.
  pub fn zeroed(baseline: &MetricsBaseline) -> Self {
    Self {
      cumulative_value: 0.0,
      cumulative_workflow_count: 0,
      ..Self::from_baseline(baseline)
    }
  }

  pub fn enqueue(&mut self) { self.queue_depth += 1; }

  /// Move one item from the queue into processing.
  pub fn begin_processing(&mut self) {
    self.queue_depth = self.queue_depth.saturating_sub(1);
    self.active_processing_count += 1;
  }

  /// Move one item out of processing and credit its value and workflows.
  pub fn finish_processing(&mut self, value: f64, workflows: usize) {
    self.active_processing_count =
      self.active_processing_count.saturating_sub(1);
    self.cumulative_value += value;
    self.today_value += value;
    self.cumulative_workflow_count += workflows as u64;
  }
}

// ─── Pipeline counts ─────────────────────────────────────────────────────────

/// Per-phase item counts, reported to observers alongside the metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineCounts {
  pub incoming:   u64,
  pub processing: u64,
  pub completed:  u64,
}

impl PipelineCounts {
  pub fn enqueue(&mut self) { self.incoming += 1; }

  pub fn begin_processing(&mut self) {
    self.incoming = self.incoming.saturating_sub(1);
    self.processing += 1;
  }

  pub fn finish_processing(&mut self) {
    self.processing = self.processing.saturating_sub(1);
    self.completed += 1;
  }
}
