//! Local key-value persistence
//!
//! The local-storage analog: a single SQLite file holding one `records`
//! table of key/value pairs. Three keys are in use (`conversations`,
//! `settings`, and `theme`), each holding one JSON document.

use crate::error::{ColloquyError, Result};

use anyhow::Context;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

/// Key under which the conversations record is stored
pub const CONVERSATIONS_KEY: &str = "conversations";

/// Key under which the settings record is stored
pub const SETTINGS_KEY: &str = "settings";

/// Key under which the theme preference is stored
pub const THEME_KEY: &str = "theme";

/// Fixed storage quota reported by usage calculations (10 MiB)
pub const STORAGE_QUOTA_BYTES: usize = 10 * 1024 * 1024;

/// Key-value storage backend for all persisted records
#[derive(Clone)]
pub struct LocalStore {
    db_path: PathBuf,
}

impl LocalStore {
    /// Create a new store instance
    ///
    /// Initializes the database file in the user's data directory. The
    /// path can be overridden via the `COLLOQUY_DATA_DB` environment
    /// variable, which makes it easy to point the binary at a test DB
    /// or alternate file.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("COLLOQUY_DATA_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "colloquy", "colloquy")
            .ok_or_else(|| ColloquyError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        let db_path = data_dir.join("colloquy.db");
        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Create a store that uses the specified database path
    ///
    /// This is primarily useful for tests where the default application
    /// data directory is not desirable.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::storage::LocalStore;
    ///
    /// let store = LocalStore::new_with_path("/tmp/test_colloquy.db").unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ColloquyError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ColloquyError::Storage(e.to_string()).into())
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create records table")
        .map_err(|e| ColloquyError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Read the value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT value FROM records WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query record")
        .map_err(|e| ColloquyError::Storage(e.to_string()).into())
    }

    /// Write `value` under `key`, replacing any previous value
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO records (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .context("Failed to write record")
        .map_err(|e| ColloquyError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete the record under `key`; unknown keys are a no-op
    pub fn delete(&self, key: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM records WHERE key = ?", params![key])
            .context("Failed to delete record")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Serialized length (bytes) of the record under `key`, 0 if absent
    pub fn len_of(&self, key: &str) -> Result<usize> {
        Ok(self.get(key)?.map(|value| value.len()).unwrap_or(0))
    }

    /// Erase every persisted record
    pub fn clear(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM records", [])
            .context("Failed to clear records")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    /// Helper: create a temporary store backed by a temp directory.
    ///
    /// Returns both the `LocalStore` and the `TempDir` so the caller
    /// keeps ownership of the directory (preventing it from being
    /// removed).
    fn create_test_store() -> (LocalStore, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("colloquy.db");
        let store = LocalStore::new_with_path(db_path).expect("failed to create store");
        (store, dir)
    }

    #[test]
    fn test_init_creates_records_table() {
        let (store, _dir) = create_test_store();
        let conn = Connection::open(&store.db_path).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='records'",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_get_missing_key_returns_none() {
        let (store, _dir) = create_test_store();
        assert!(store.get("missing").expect("get failed").is_none());
    }

    #[test]
    fn test_put_then_get_roundtrip() {
        let (store, _dir) = create_test_store();
        store.put(SETTINGS_KEY, r#"{"theme":"dark"}"#).expect("put failed");
        assert_eq!(
            store.get(SETTINGS_KEY).expect("get failed").as_deref(),
            Some(r#"{"theme":"dark"}"#)
        );
    }

    #[test]
    fn test_put_overwrites_existing_value() {
        let (store, _dir) = create_test_store();
        store.put(THEME_KEY, "light").expect("first put failed");
        store.put(THEME_KEY, "dark").expect("second put failed");
        assert_eq!(
            store.get(THEME_KEY).expect("get failed").as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn test_delete_removes_record() {
        let (store, _dir) = create_test_store();
        store.put(THEME_KEY, "dark").expect("put failed");
        store.delete(THEME_KEY).expect("delete failed");
        assert!(store.get(THEME_KEY).expect("get failed").is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (store, _dir) = create_test_store();
        store.delete("never-existed").expect("first delete failed");
        store.delete("never-existed").expect("second delete failed");
    }

    #[test]
    fn test_len_of_reports_serialized_length() {
        let (store, _dir) = create_test_store();
        store.put(CONVERSATIONS_KEY, "0123456789").expect("put failed");
        assert_eq!(store.len_of(CONVERSATIONS_KEY).expect("len failed"), 10);
        assert_eq!(store.len_of("missing").expect("len failed"), 0);
    }

    #[test]
    fn test_clear_erases_all_records() {
        let (store, _dir) = create_test_store();
        store.put(SETTINGS_KEY, "{}").expect("put failed");
        store.put(CONVERSATIONS_KEY, "{}").expect("put failed");
        store.put(THEME_KEY, "light").expect("put failed");

        store.clear().expect("clear failed");

        assert!(store.get(SETTINGS_KEY).expect("get failed").is_none());
        assert!(store.get(CONVERSATIONS_KEY).expect("get failed").is_none());
        assert!(store.get(THEME_KEY).expect("get failed").is_none());
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        // Use nested path to ensure parent directory creation is exercised.
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("colloquy.db");
        env::set_var("COLLOQUY_DATA_DB", db_path.to_string_lossy().to_string());

        let store = LocalStore::new().expect("new failed with env override");
        assert_eq!(store.db_path, db_path);
        assert!(db_path.parent().unwrap().exists());

        env::remove_var("COLLOQUY_DATA_DB");
    }
}
