//! [`SqliteStore`]: the SQLite implementation of [`DurableStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use sluice_core::store::DurableStore;

use crate::{Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A durable key-value and list store backed by a single SQLite file.
///
/// Cloning shares the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── DurableStore impl ───────────────────────────────────────────────────────

impl DurableStore for SqliteStore {
  type Error = crate::Error;

  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        let value = conn
          .query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |r| r.get(0),
          )
          .optional()?;
        Ok(value)
      })
      .await?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kv (key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value",
          rusqlite::params![key, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn append(&self, list: &str, value: String) -> Result<()> {
    let list = list.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO list_entries (list, value) VALUES (?1, ?2)",
          rusqlite::params![list, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list(&self, list: &str) -> Result<Vec<String>> {
    let list = list.to_owned();
    let values = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT value FROM list_entries WHERE list = ?1 ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![list], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(values)
  }

  async fn clear(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM kv", [])?;
        tx.execute("DELETE FROM list_entries", [])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
