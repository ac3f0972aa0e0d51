//! Small persistent key/value store for client preferences.
//!
//! A flat JSON object of strings on disk, read once on open and rewritten on
//! every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ViewError, ViewResult};

#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    /// `None` keeps preferences in memory only.
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl PreferenceStore {
    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`. A missing file is an empty store; a file
    /// that cannot be parsed is ignored and replaced on the next write.
    pub fn open(path: impl AsRef<Path>) -> ViewResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable preference file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = values.len(), "Preferences loaded");
        Ok(Self {
            path: Some(path),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a value and persist the store. The previous value is restored
    /// when the write fails.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> ViewResult<()> {
        let previous = self.values.insert(key.to_string(), value.into());
        if let Err(e) = self.flush() {
            match previous {
                Some(previous) => self.values.insert(key.to_string(), previous),
                None => self.values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn flush(&self) -> ViewResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(path, json).map_err(|e| {
            ViewError::Preferences(format!("failed to write {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path().join("prefs.json")).unwrap();
        assert!(store.get("themeMode").is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = PreferenceStore::open(&path).unwrap();
        store.set("themeMode", "dark").unwrap();

        let reopened = PreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get("themeMode"), Some("dark"));
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut store = PreferenceStore::open(&path).unwrap();
        assert!(store.get("themeMode").is_none());
        store.set("themeMode", "light").unwrap();
        assert_eq!(PreferenceStore::open(&path).unwrap().get("themeMode"), Some("light"));
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("prefs");
        let mut store = PreferenceStore::open(parent.join("prefs.json")).unwrap();
        store.set("themeMode", "dark").unwrap();

        std::fs::remove_dir_all(&parent).unwrap();
        std::fs::write(&parent, "not a directory").unwrap();

        assert!(store.set("themeMode", "light").is_err());
        assert_eq!(store.get("themeMode"), Some("dark"));
        assert!(store.set("fresh", "value").is_err());
        assert!(store.get("fresh").is_none());
    }
}
