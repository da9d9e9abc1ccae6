// SQLite-backed key-value storage

use crate::kv::{KeyValueStore, validate_key};
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key-value store kept in a single `todostore.db` file
pub struct SqliteKv {
    base_path: PathBuf,
    db: Connection,
}

impl SqliteKv {
    /// Open or create the database inside `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        fs::create_dir_all(&base_path).context("Failed to create storage directory")?;

        let db_path = base_path.join("todostore.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let kv = Self { base_path, db };
        kv.create_schema()?;
        kv.create_gitignore()?;

        Ok(kv)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let kv = Self {
            base_path: PathBuf::new(),
            db,
        };
        kv.create_schema()?;
        Ok(kv)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "todostore.db\ntodostore.db-shm\ntodostore.db-wal\n")?;
        }
        Ok(())
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("Failed to read storage key")?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .context("Failed to write storage key")?;
        debug!(key, bytes = value.len(), "Wrote storage key");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .context("Failed to remove storage key")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_database() {
        let temp = TempDir::new().unwrap();

        let _kv = SqliteKv::open(temp.path()).unwrap();
        assert!(temp.path().join("todostore.db").exists());
        assert!(temp.path().join(".gitignore").exists());
    }

    #[test]
    fn test_set_get_remove() {
        let mut kv = SqliteKv::open_in_memory().unwrap();

        assert_eq!(kv.get("todos").unwrap(), None);

        kv.set("todos", "[]").unwrap();
        kv.set("todos", "[1]").unwrap();
        assert_eq!(kv.get("todos").unwrap().as_deref(), Some("[1]"));

        kv.remove("todos").unwrap();
        assert_eq!(kv.get("todos").unwrap(), None);
        kv.remove("todos").unwrap();
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut kv = SqliteKv::open(temp.path()).unwrap();
            kv.set("theme", "dark").unwrap();
        }

        let kv = SqliteKv::open(temp.path()).unwrap();
        assert_eq!(kv.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_rejects_bad_key() {
        let mut kv = SqliteKv::open_in_memory().unwrap();
        assert!(kv.set("", "x").is_err());
    }
}
