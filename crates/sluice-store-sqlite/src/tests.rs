//! Integration tests for `SqliteStore` against an in-memory database.

use sluice_core::store::DurableStore;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Scalars ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_key_returns_none() {
  let s = store().await;
  assert!(s.get("metrics:cumulative_value").await.unwrap().is_none());
}

#[tokio::test]
async fn set_then_get() {
  let s = store().await;
  s.set("metrics:cumulative_value", "47.3".into()).await.unwrap();
  let v = s.get("metrics:cumulative_value").await.unwrap();
  assert_eq!(v.as_deref(), Some("47.3"));
}

#[tokio::test]
async fn set_overwrites_last_write_wins() {
  let s = store().await;
  s.set("k", "1".into()).await.unwrap();
  s.set("k", "2".into()).await.unwrap();
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some("2"));
}

// ─── Lists ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_preserves_order() {
  let s = store().await;
  for v in ["a", "b", "c"] {
    s.append("completed_items", v.into()).await.unwrap();
  }
  let values = s.list("completed_items").await.unwrap();
  assert_eq!(values, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn lists_are_independent() {
  let s = store().await;
  s.append("one", "x".into()).await.unwrap();
  s.append("two", "y".into()).await.unwrap();
  assert_eq!(s.list("one").await.unwrap(), vec!["x"]);
  assert_eq!(s.list("two").await.unwrap(), vec!["y"]);
  assert!(s.list("three").await.unwrap().is_empty());
}

// ─── Clear ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clear_removes_keys_and_lists() {
  let s = store().await;
  s.set("k", "v".into()).await.unwrap();
  s.append("l", "v".into()).await.unwrap();

  s.clear().await.unwrap();

  assert!(s.get("k").await.unwrap().is_none());
  assert!(s.list("l").await.unwrap().is_empty());
}

#[tokio::test]
async fn reopening_a_file_keeps_values() {
  let dir = std::env::temp_dir().join(format!(
    "sluice-store-{}",
    std::process::id()
  ));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("reopen.db");
  let _ = std::fs::remove_file(&path);

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.set("metrics:cumulative_workflow_count", "12".into())
      .await
      .unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(
    s.get("metrics:cumulative_workflow_count")
      .await
      .unwrap()
      .as_deref(),
    Some("12")
  );
  let _ = std::fs::remove_dir_all(&dir);
}
