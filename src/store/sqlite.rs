use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use super::{history_key, snapshot_key, SnapshotStore, StoreError, HISTORY_LIMIT};
use crate::snapshot::{HistoryEntry, Snapshot};

const CONNECTION_TEST_KEY: &str = "test:connection";
const CONNECTION_TEST_VALUE: &str = "OK";

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    // one row per list element; the highest id is the head of the list
    conn.execute(
        "CREATE TABLE IF NOT EXISTS list_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            list_key TEXT NOT NULL,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_list_items_key ON list_items(list_key, id)",
        [],
    )?;

    Ok(())
}

/// SQLite-backed key-value store. Open once per command, reuse for the cycle.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Connectivity(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connectivity(format!("{}: {e}", path.display())))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;
        init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }

    /// Write, read back and delete a scratch key.
    ///
    /// Stronger than `ping`: proves the store accepts writes, not just
    /// that it answers.
    pub fn check_connection(&self) -> Result<(), StoreError> {
        self.ping()?;
        self.set_value(CONNECTION_TEST_KEY, CONNECTION_TEST_VALUE)?;
        // the scratch key is removed even when the read back fails
        let retrieved = self.get_value(CONNECTION_TEST_KEY);
        self.delete_value(CONNECTION_TEST_KEY)?;
        let retrieved = retrieved?;

        match retrieved.as_deref() {
            Some(CONNECTION_TEST_VALUE) => Ok(()),
            other => Err(StoreError::Connectivity(format!(
                "read back {other:?} for {CONNECTION_TEST_KEY}, expected {CONNECTION_TEST_VALUE:?}"
            ))),
        }
    }

    fn set_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn delete_value(&self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Push onto the head of a list and keep only the newest `keep` items.
    fn push_trimmed(&self, list_key: &str, value: &str, keep: usize) -> Result<(), StoreError> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO list_items (list_key, value) VALUES (?1, ?2)",
            params![list_key, value],
        )?;

        tx.execute(
            "DELETE FROM list_items
             WHERE list_key = ?1
               AND id NOT IN (
                   SELECT id FROM list_items
                   WHERE list_key = ?1
                   ORDER BY id DESC
                   LIMIT ?2
               )",
            params![list_key, keep],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn range(&self, list_key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare_cached(
            "SELECT value FROM list_items
             WHERE list_key = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;

        let values = stmt
            .query_map(params![list_key, limit], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(values)
    }
}

impl SnapshotStore for SqliteStore {
    fn get(&self, vehicle_id: &str) -> Result<Option<Snapshot>, StoreError> {
        match self.get_value(&snapshot_key(vehicle_id))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn put(&self, vehicle_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        self.set_value(&snapshot_key(vehicle_id), &json)
    }

    fn append_history(&self, vehicle_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        let json = serde_json::to_string(entry)?;
        self.push_trimmed(&history_key(vehicle_id), &json, HISTORY_LIMIT)
    }

    fn list_history(&self, vehicle_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        self.range(&history_key(vehicle_id), limit)?
            .iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;
        Ok(())
    }
}
