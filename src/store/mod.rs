//! Persisted view state backed by SQLite.
//!
//! Every view keeps a handful of JSON values (chat transcript, manual Q&A,
//! active tab, last sensor snapshot) that must survive a restart. They live
//! in one key/value table; views only ever see their own namespace through
//! [`ViewStore`].
//!
//! Design:
//! - WAL mode, one row per key, full overwrite on every save
//! - Values are JSON text, never patched in place
//! - In-memory backend for `--ephemeral` runs and tests

mod session;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::MonitorResult;

pub use session::{Persisted, SessionStore, ViewStore};

/// Raw key/value storage behind the session store.
pub trait StateBackend: Send + Sync {
    fn read(&self, key: &str) -> MonitorResult<Option<String>>;
    /// Replace the whole value stored under `key`.
    fn write(&self, key: &str, value: &str) -> MonitorResult<()>;
}

// ── SqliteBackend ─────────────────────────────────────────────────

/// Key/value table in a local SQLite file.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the state database.
    ///
    /// If `path` is `None`, uses an in-memory database.
    pub fn open(path: Option<&Path>) -> MonitorResult<Self> {
        let conn = match path {
            Some(p) => {
                if let Some(parent) = p.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                Connection::open(p)?
            }
            None => Connection::open_in_memory()?,
        };

        let backend = Self {
            conn: Mutex::new(conn),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    fn init_schema(&self) -> MonitorResult<()> {
        let conn = self.lock();
        // journal_mode returns a row, so it can't go through execute()
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             CREATE TABLE IF NOT EXISTS session_state (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                updated_at  INTEGER NOT NULL
             );",
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateBackend for SqliteBackend {
    fn read(&self, key: &str) -> MonitorResult<Option<String>> {
        let conn = self.lock();
        let value = conn
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> MonitorResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO session_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now_epoch_ms()],
        )?;
        Ok(())
    }
}

// ── MemoryBackend ─────────────────────────────────────────────────

/// Process-local backend; nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateBackend for MemoryBackend {
    fn read(&self, key: &str) -> MonitorResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> MonitorResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
