// String key-value storage backing the task list and theme

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const CURRENT_VERSION: u32 = 1;

/// Opaque string store, the only persistence the task list relies on
pub trait KeyValueStore {
    /// Read the value under `key`, `None` when nothing is stored
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Drop `key`; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Box<K> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Keys end up as file names and table rows, so keep them boring
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

/// Process-local store, used by tests and embedders with their own persistence
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    values: HashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Directory-backed store holding one `<key>.value` file per key
#[derive(Debug, Clone)]
pub struct FileKv {
    base_path: PathBuf,
}

impl FileKv {
    /// Open or create a store in `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        fs::create_dir_all(&base_path).context("Failed to create storage directory")?;

        let kv = Self { base_path };
        kv.write_version()?;

        debug!(path = ?kv.base_path, "Opened file storage");
        Ok(kv)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.value", key)))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&path).context("Failed to open storage file")?;
        file.lock_shared().context("Failed to acquire file lock")?;

        let mut value = String::new();
        file.read_to_string(&mut value)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;

        // Truncate only once the lock is held
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .context("Failed to open storage file for writing")?;
        file.lock_exclusive().context("Failed to acquire file lock")?;

        file.set_len(0)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        debug!(key, bytes = value.len(), "Wrote storage key");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_kv_roundtrip() {
        let mut kv = MemoryKv::new();
        assert_eq!(kv.get("todos").unwrap(), None);

        kv.set("todos", "[]").unwrap();
        assert_eq!(kv.get("todos").unwrap().as_deref(), Some("[]"));

        kv.remove("todos").unwrap();
        assert!(kv.is_empty());

        // Removing again is fine
        kv.remove("todos").unwrap();
    }

    #[test]
    fn test_file_kv_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data");

        let kv = FileKv::open(&path).unwrap();
        assert!(path.exists());
        assert!(path.join(".version").exists());
        assert_eq!(kv.base_path(), path.as_path());
    }

    #[test]
    fn test_file_kv_set_get_remove() {
        let temp = TempDir::new().unwrap();
        let mut kv = FileKv::open(temp.path()).unwrap();

        assert_eq!(kv.get("theme").unwrap(), None);

        kv.set("theme", "dark").unwrap();
        assert_eq!(kv.get("theme").unwrap().as_deref(), Some("dark"));
        assert!(temp.path().join("theme.value").exists());
        assert_eq!(std::fs::read_to_string(temp.path().join("theme.value")).unwrap(), "dark");

        kv.remove("theme").unwrap();
        assert_eq!(kv.get("theme").unwrap(), None);
        kv.remove("theme").unwrap();
    }

    #[test]
    fn test_file_kv_overwrite_shorter_value() {
        let temp = TempDir::new().unwrap();
        let mut kv = FileKv::open(temp.path()).unwrap();

        kv.set("todos", "a much longer value than the next").unwrap();
        kv.set("todos", "[]").unwrap();
        assert_eq!(kv.get("todos").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_kv_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut kv = FileKv::open(temp.path()).unwrap();
            kv.set("todos", r#"[{"id":1,"text":"a","completed":false}]"#).unwrap();
        }

        let kv = FileKv::open(temp.path()).unwrap();
        assert!(kv.get("todos").unwrap().unwrap().contains("\"text\":\"a\""));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("todos").is_ok());
        assert!(validate_key("my-key_2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(&"x".repeat(65)).is_err());
    }
}
