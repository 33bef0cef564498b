//! Engine configuration.
//!
//! Every section has defaults matching the stock demo, so an empty config
//! file yields a working engine. Latencies are whole milliseconds.

use std::time::Duration;

use rand::Rng as _;
use serde::Deserialize;
use sluice_core::metrics::MetricsBaseline;

use crate::{Error, Result};

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// One pipeline stage and how long it takes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StageSpec {
  pub name:       String,
  pub latency_ms: u64,
}

impl StageSpec {
  pub fn new(name: impl Into<String>, latency_ms: u64) -> Self {
    Self { name: name.into(), latency_ms }
  }

  pub fn latency(&self) -> Duration { Duration::from_millis(self.latency_ms) }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Ordered stages every item passes through.
  pub stages:              Vec<StageSpec>,
  pub workflow_latency_ms: u64,
  /// Payload entity copied into each activity event.
  pub subject_entity_key:  String,
  /// Completed items and activities kept in memory before the oldest are
  /// dropped.
  pub history_limit:       usize,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      stages:              vec![
        StageSpec::new("SCANNING", 500),
        StageSpec::new("PARSING", 800),
        StageSpec::new("ROUTING", 600),
        StageSpec::new("EXECUTING", 1200),
      ],
      workflow_latency_ms: 300,
      subject_entity_key:  "student".to_owned(),
      history_limit:       10_000,
    }
  }
}

impl PipelineConfig {
  pub fn workflow_latency(&self) -> Duration {
    Duration::from_millis(self.workflow_latency_ms)
  }
}

// ─── Generator ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
  pub min_interval_ms: u64,
  pub max_interval_ms: u64,
  /// No item is generated while this many are processing.
  pub ceiling:         u64,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self {
      min_interval_ms: 5_000,
      max_interval_ms: 15_000,
      ceiling:         5,
    }
  }
}

impl GeneratorConfig {
  /// Draw the next delay uniformly from `[min, max]`.
  pub fn next_delay(&self) -> Duration {
    let ms = rand::thread_rng()
      .gen_range(self.min_interval_ms..=self.max_interval_ms);
    Duration::from_millis(ms)
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub pipeline:            PipelineConfig,
  pub generator:           GeneratorConfig,
  pub metrics:             MetricsBaseline,
  /// Per-observer queue capacity. Events beyond it are dropped for that
  /// observer.
  pub observer_queue:      usize,
  /// Items included in an observer's initial state.
  pub catch_up_items:      usize,
  /// Activity events included in an observer's initial state.
  pub catch_up_activities: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      pipeline:            PipelineConfig::default(),
      generator:           GeneratorConfig::default(),
      metrics:             MetricsBaseline::default(),
      observer_queue:      256,
      catch_up_items:      10,
      catch_up_activities: 20,
    }
  }
}

impl EngineConfig {
  pub fn validate(&self) -> Result<()> {
    if self.pipeline.stages.is_empty() {
      return Err(Error::Config("pipeline.stages must not be empty".into()));
    }
    if self.generator.min_interval_ms > self.generator.max_interval_ms {
      return Err(Error::Config(format!(
        "generator.min_interval_ms ({}) exceeds max_interval_ms ({})",
        self.generator.min_interval_ms, self.generator.max_interval_ms
      )));
    }
    if self.observer_queue == 0 {
      return Err(Error::Config("observer_queue must be at least 1".into()));
    }
    Ok(())
  }
}
