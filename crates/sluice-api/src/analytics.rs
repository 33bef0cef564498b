//! Handler for `GET /analytics`.
//!
//! The hourly breakdown is synthetic: there is no per-hour history behind
//! it. The daily block reads the live metrics.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{Duration, Timelike as _, Utc};
use rand::Rng as _;
use serde::Serialize;
use sluice_core::store::DurableStore;
use sluice_engine::Hub;

#[derive(Debug, Serialize)]
pub struct Report {
  pub hourly: Vec<HourlyBucket>,
  pub daily:  Daily,
  pub weekly: Weekly,
}

#[derive(Debug, Serialize)]
pub struct HourlyBucket {
  /// Hour of day (UTC), 0-23.
  pub hour:       u32,
  pub tasks:      u32,
  pub time_saved: f64,
}

#[derive(Debug, Serialize)]
pub struct Daily {
  pub total_workflows: u64,
  pub today_value:     f64,
  pub success_rate:    f64,
}

/// Which days of the week are free of manual work.
#[derive(Debug, Serialize)]
pub struct Weekly {
  pub monday:    bool,
  pub tuesday:   bool,
  pub wednesday: bool,
  pub thursday:  bool,
  pub friday:    bool,
  pub weekend:   bool,
}

const WEEKLY: Weekly = Weekly {
  monday:    true,
  tuesday:   false,
  wednesday: false,
  thursday:  true,
  friday:    true,
  weekend:   true,
};

/// The last 24 hours, oldest first, ending with the current hour.
fn hourly() -> Vec<HourlyBucket> {
  let now = Utc::now();
  let mut rng = rand::thread_rng();
  (0..24)
    .rev()
    .map(|ago| HourlyBucket {
      hour:       (now - Duration::hours(ago)).hour(),
      tasks:      rng.gen_range(5..25),
      time_saved: rng.gen_range(0.5..2.5),
    })
    .collect()
}

/// `GET /analytics`
pub async fn handler<S>(State(hub): State<Arc<Hub<S>>>) -> Json<Report>
where
  S: DurableStore + 'static,
{
  let metrics = hub.metrics();
  Json(Report {
    hourly: hourly(),
    daily:  Daily {
      total_workflows: metrics.cumulative_workflow_count,
      today_value:     metrics.today_value,
      success_rate:    metrics.success_rate,
    },
    weekly: WEEKLY,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hourly_covers_24_consecutive_hours() {
    let buckets = hourly();
    assert_eq!(buckets.len(), 24);
    for pair in buckets.windows(2) {
      assert_eq!((pair[0].hour + 1) % 24, pair[1].hour);
    }
  }

  #[test]
  fn hourly_values_stay_in_range() {
    for bucket in hourly() {
      assert!((5..25).contains(&bucket.tasks));
      assert!((0.5..2.5).contains(&bucket.time_saved));
    }
  }
}
