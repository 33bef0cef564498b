//! The `DurableStore` trait.
//!
//! Implemented by storage backends (e.g. `sluice-store-sqlite`). The engine
//! mirrors a small subset of its state through this abstraction and never
//! depends on a concrete backend.

use std::future::Future;

/// Key under which the cumulative value is persisted.
pub const CUMULATIVE_VALUE_KEY: &str = "metrics:cumulative_value";
/// Key under which the cumulative workflow count is persisted.
pub const CUMULATIVE_WORKFLOW_COUNT_KEY: &str =
  "metrics:cumulative_workflow_count";
/// List that receives every completed item as JSON.
pub const COMPLETED_ITEMS_LIST: &str = "completed_items";

/// A generic durable key-value and list store.
///
/// Writes need not be ordered relative to one another; the last write to a
/// key wins. All methods return `Send` futures so the store can be shared by
/// tasks on a multi-threaded runtime.
pub trait DurableStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read a scalar value. Returns `None` if the key was never set.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Overwrite a scalar value.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Append a value to the end of a list, creating it if needed.
  fn append<'a>(
    &'a self,
    list: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Read the whole of a list, oldest entry first.
  ///
  /// The engine never reads lists back; this exists so operators and tests
  /// can inspect what was persisted.
  fn list<'a>(
    &'a self,
    list: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Remove every key and every list.
  fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
