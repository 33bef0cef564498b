//! SQL schema for the Sluice SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS kv (
    key    TEXT PRIMARY KEY,
    value  TEXT NOT NULL
);

-- Lists are append-only between clears. `seq` preserves append order.
CREATE TABLE IF NOT EXISTS list_entries (
    seq    INTEGER PRIMARY KEY AUTOINCREMENT,
    list   TEXT NOT NULL,
    value  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS list_entries_list_idx ON list_entries(list, seq);

PRAGMA user_version = 1;
";
