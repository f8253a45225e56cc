//! SQLite-backed key-value store for embedded hosts.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use super::KeyValueStore;
use crate::core::errors::WidgetResult;

/// Durable store backed by a single SQLite table.
///
/// The [`KeyValueStore`] contract is infallible; row-level failures are
/// logged and degrade to `None`/no-op so a corrupt profile never blocks the
/// chat.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Table name for widget storage.
    pub const TABLE: &'static str = "widget_kv";

    /// Open (or create) the store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the table
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>) -> WidgetResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database, useful for tests.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> WidgetResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> WidgetResult<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
            table = Self::TABLE
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        let Ok(conn) = self.conn.lock() else {
            warn!("storage mutex poisoned, treating key {key} as absent");
            return None;
        };
        let result = conn
            .query_row(
                &format!("SELECT value FROM {table} WHERE key = ?1", table = Self::TABLE),
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional();
        match result {
            Ok(value) => value,
            Err(err) => {
                warn!("storage read failed for {key}: {err}");
                None
            }
        }
    }

    fn put(&self, key: &str, value: &str) {
        let Ok(conn) = self.conn.lock() else {
            warn!("storage mutex poisoned, dropping write to {key}");
            return;
        };
        let result = conn.execute(
            &format!(
                "INSERT INTO {table} (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                table = Self::TABLE
            ),
            rusqlite::params![key, value],
        );
        if let Err(err) = result {
            warn!("storage write failed for {key}: {err}");
        }
    }

    fn remove(&self, key: &str) {
        let Ok(conn) = self.conn.lock() else {
            warn!("storage mutex poisoned, dropping delete of {key}");
            return;
        };
        let result = conn.execute(
            &format!("DELETE FROM {table} WHERE key = ?1", table = Self::TABLE),
            rusqlite::params![key],
        );
        if let Err(err) = result {
            warn!("storage delete failed for {key}: {err}");
        }
    }
}
