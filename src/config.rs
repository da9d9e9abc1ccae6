// Configuration loaded from YAML

use crate::kv::{FileKv, KeyValueStore};
use crate::sqlite::SqliteKv;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where task and theme values are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: default_data_dir(),
            color: true,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`
    ///
    /// A missing file yields the defaults; a file that fails to parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Open the configured storage backend
    pub fn open_storage(&self) -> Result<Box<dyn KeyValueStore>> {
        debug!(backend = ?self.backend, data_dir = ?self.data_dir, "Opening storage");
        Ok(match self.backend {
            Backend::File => Box::new(FileKv::open(&self.data_dir)?),
            Backend::Sqlite => Box::new(SqliteKv::open(&self.data_dir)?),
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("todostore").join("config.yaml"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("todostore"))
        .unwrap_or_else(|| PathBuf::from(".todostore"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(Some(temp.path().join("nope.yaml").as_path())).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend, Backend::File);
        assert!(config.color);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("backend: sqlite\n").unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert!(config.color);
        assert_eq!(config.data_dir, default_data_dir());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = "backend: file\ndata_dir: /tmp/todos\ncolor: false\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/todos"));
        assert!(!config.color);
    }

    #[test]
    fn test_empty_yaml_gives_defaults() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_bad_yaml_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "backend: [oops").unwrap();
        assert!(Config::load(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_open_storage_backends() {
        let temp = TempDir::new().unwrap();

        for backend in [Backend::File, Backend::Sqlite] {
            let config = Config {
                backend,
                data_dir: temp.path().join(format!("{:?}", backend)),
                color: false,
            };
            let mut kv = config.open_storage().unwrap();
            kv.set("theme", "dark").unwrap();
            assert_eq!(kv.get("theme").unwrap().as_deref(), Some("dark"));
        }
    }
}
