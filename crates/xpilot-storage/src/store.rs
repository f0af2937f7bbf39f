//! Key-value persistence seam.
//!
//! The chat layer only needs "read a record", "write a record" and "remove a
//! record". [`SqliteStore`] backs that with the on-disk database;
//! [`MemoryStore`] keeps everything in a map for tests and throwaway runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::OptionalExtension;

use xpilot_core::error::XpilotError;

use crate::db::Database;

/// A durable string-keyed record store.
pub trait KeyValueStore: Send + Sync {
    /// Read a record. A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> Result<Option<String>, XpilotError>;

    /// Insert or overwrite a record.
    fn set(&self, key: &str, value: &str) -> Result<(), XpilotError>;

    /// Delete a record. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), XpilotError>;
}

/// SQLite-backed store using the `kv_store` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, XpilotError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| XpilotError::Storage(format!("Failed to read {}: {}", key, e)))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), XpilotError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value],
            )
            .map_err(|e| XpilotError::Storage(format!("Failed to write {}: {}", key, e)))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), XpilotError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])
                .map_err(|e| XpilotError::Storage(format!("Failed to remove {}: {}", key, e)))?;
            Ok(())
        })
    }
}

/// In-memory store. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, XpilotError> {
        self.records
            .lock()
            .map_err(|e| XpilotError::Storage(format!("store lock poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, XpilotError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), XpilotError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), XpilotError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("chats", "[]").unwrap();
        assert_eq!(store.get("chats").unwrap().as_deref(), Some("[]"));

        store.set("chats", "[1]").unwrap();
        assert_eq!(store.get("chats").unwrap().as_deref(), Some("[1]"));

        store.remove("chats").unwrap();
        assert_eq!(store.get("chats").unwrap(), None);

        // Removing twice is fine.
        store.remove("chats").unwrap();
    }

    #[test]
    fn test_memory_store_contract() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store_contract() {
        let db = Arc::new(Database::in_memory().unwrap());
        exercise(&SqliteStore::new(db));
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xpilot.db");
        {
            let store = SqliteStore::new(Arc::new(Database::new(&path).unwrap()));
            store.set("xpilot-chats", "[\"persisted\"]").unwrap();
        }
        let store = SqliteStore::new(Arc::new(Database::new(&path).unwrap()));
        assert_eq!(
            store.get("xpilot-chats").unwrap().as_deref(),
            Some("[\"persisted\"]")
        );
    }

    #[test]
    fn test_sqlite_store_keys_are_independent() {
        let store = SqliteStore::new(Arc::new(Database::in_memory().unwrap()));
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }
}
