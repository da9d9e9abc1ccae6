// Light/dark theme preference

use crate::kv::KeyValueStore;
use eyre::Result;
use std::str::FromStr;
use tracing::{debug, warn};

/// Storage key for the theme, separate from the task list
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Value used both for storage and as the presentation attribute
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Read the stored preference, falling back to light
    pub fn load<K: KeyValueStore + ?Sized>(kv: &K) -> Self {
        let stored = match kv.get(THEME_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = ?e, "Failed to read theme, using default");
                return Theme::default();
            }
        };

        match stored.as_deref().map(str::parse::<Theme>) {
            Some(Ok(theme)) => theme,
            Some(Err(_)) => {
                debug!(value = ?stored, "Ignoring unknown theme value");
                Theme::default()
            }
            None => Theme::default(),
        }
    }

    pub fn save<K: KeyValueStore + ?Sized>(self, kv: &mut K) -> Result<()> {
        kv.set(THEME_KEY, self.as_str())
    }

    /// Flip the stored theme and return the new one
    pub fn toggle<K: KeyValueStore + ?Sized>(kv: &mut K) -> Result<Self> {
        let next = Self::load(kv).toggled();
        next.save(kv)?;
        Ok(next)
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Theme {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(eyre::eyre!("Unknown theme: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    /// Backend that cannot be read
    struct UnreadableKv;

    impl KeyValueStore for UnreadableKv {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(eyre::eyre!("disk unreadable"))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(eyre::eyre!("disk full"))
        }

        fn remove(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_defaults_to_light() {
        let kv = MemoryKv::new();
        assert_eq!(Theme::load(&kv), Theme::Light);
    }

    #[test]
    fn test_invalid_value_defaults_to_light() {
        let mut kv = MemoryKv::new();
        kv.set(THEME_KEY, "solarized").unwrap();
        assert_eq!(Theme::load(&kv), Theme::Light);

        // Quoted JSON is not a valid stored theme either
        kv.set(THEME_KEY, "\"dark\"").unwrap();
        assert_eq!(Theme::load(&kv), Theme::Light);
    }

    #[test]
    fn test_read_failure_defaults_to_light() {
        assert_eq!(Theme::load(&UnreadableKv), Theme::Light);
    }

    #[test]
    fn test_toggle_surfaces_write_failure() {
        assert!(Theme::toggle(&mut UnreadableKv).is_err());
    }

    #[test]
    fn test_toggle_persists() {
        let mut kv = MemoryKv::new();

        assert_eq!(Theme::toggle(&mut kv).unwrap(), Theme::Dark);
        assert_eq!(kv.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(Theme::load(&kv), Theme::Dark);

        assert_eq!(Theme::toggle(&mut kv).unwrap(), Theme::Light);
        assert_eq!(Theme::load(&kv), Theme::Light);
    }

    #[test]
    fn test_theme_does_not_touch_tasks_key() {
        let mut kv = MemoryKv::new();
        kv.set("todos", "[]").unwrap();
        Theme::Dark.save(&mut kv).unwrap();
        assert_eq!(kv.get("todos").unwrap().as_deref(), Some("[]"));
        assert_eq!(kv.len(), 2);
    }
}
