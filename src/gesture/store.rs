//! Durable gesture-to-action-key bindings.
//!
//! Bindings survive process restarts (stored under the user's config dir)
//! but are lost on reinstall, and apply per phone rather than per headset:
//! different headphones on the same machine resolve the same bindings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AccessoryError;
use crate::gesture::GestureType;

/// Key/value persistence for gesture bindings. Injected so the key store is
/// testable with an in-memory fake.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<u32>;
    fn set(&mut self, key: &str, value: u32) -> Result<()>;
}

/// On-disk layout of the binding file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BindingFile {
    #[serde(default)]
    bindings: HashMap<String, u32>,
}

/// TOML-file-backed store: ~/.config/mzlink/gestures.toml
///
/// The whole map is loaded at construction and rewritten on every set;
/// there are at most a dozen entries.
pub struct FilePreferenceStore {
    path: PathBuf,
    values: BindingFile,
}

impl FilePreferenceStore {
    /// Default binding file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mzlink")
            .join("gestures.toml")
    }

    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// Open the store at `path`, falling back to an empty map when the file
    /// is missing or unreadable.
    pub fn open(path: PathBuf) -> Self {
        let values = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(values) => values,
                    Err(e) => {
                        warn!("Failed to parse gesture bindings: {}", e);
                        BindingFile::default()
                    }
                },
                Err(e) => {
                    warn!("Failed to read gesture bindings: {}", e);
                    BindingFile::default()
                }
            }
        } else {
            BindingFile::default()
        };
        Self { path, values }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Option<u32> {
        self.values.bindings.get(key).copied()
    }

    fn set(&mut self, key: &str, value: u32) -> Result<()> {
        self.values.bindings.insert(key.to_string(), value);
        self.save()
    }
}

/// In-memory store for tests and embedders without durable preferences.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: HashMap<String, u32>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<u32> {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: u32) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Persists and resolves user-defined action keys per gesture type.
///
/// One binding per gesture type, overwritten on rebind. Resolution of an
/// unbound gesture falls back to the gesture's raw index, so the observer
/// always receives some key for a physical gesture.
pub struct GestureKeyStore {
    store: Mutex<Box<dyn PreferenceStore>>,
}

impl GestureKeyStore {
    pub fn new(store: Box<dyn PreferenceStore>) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// File-backed store at the default path.
    pub fn open_default() -> Self {
        Self::new(Box::new(FilePreferenceStore::open_default()))
    }

    /// Bind `key` to `gesture`, replacing any previous binding.
    pub fn set_binding(&self, gesture: GestureType, key: u32) -> Result<(), AccessoryError> {
        debug!("Binding {} -> action key {}", gesture, key);
        let mut store = self.store.lock().unwrap();
        store.set(gesture.as_str(), key)?;
        Ok(())
    }

    /// Last bound action key, or `None` when unbound.
    pub fn get_binding(&self, gesture: GestureType) -> Option<u32> {
        self.store.lock().unwrap().get(gesture.as_str())
    }

    /// Action key to surface for a received gesture.
    pub fn resolve(&self, gesture: GestureType) -> u32 {
        self.get_binding(gesture).unwrap_or_else(|| gesture.raw_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::ALL_GESTURES;

    fn memory_store() -> GestureKeyStore {
        GestureKeyStore::new(Box::new(MemoryPreferenceStore::new()))
    }

    #[test]
    fn test_binding_roundtrip_all_types() {
        let store = memory_store();
        for (i, g) in ALL_GESTURES.iter().enumerate() {
            let key = 1000 + i as u32;
            store.set_binding(*g, key).unwrap();
            assert_eq!(store.get_binding(*g), Some(key));
        }
    }

    #[test]
    fn test_rebind_overwrites() {
        let store = memory_store();
        store.set_binding(GestureType::Tap12, 7).unwrap();
        store.set_binding(GestureType::Tap12, 42).unwrap();
        assert_eq!(store.get_binding(GestureType::Tap12), Some(42));
    }

    #[test]
    fn test_unbound_returns_none() {
        let store = memory_store();
        assert_eq!(store.get_binding(GestureType::SwipeBack), None);
    }

    #[test]
    fn test_resolve_falls_back_to_raw_index() {
        let store = memory_store();
        assert_eq!(
            store.resolve(GestureType::TwoFingerTap),
            GestureType::TwoFingerTap.raw_index()
        );
        store.set_binding(GestureType::TwoFingerTap, 99).unwrap();
        assert_eq!(store.resolve(GestureType::TwoFingerTap), 99);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!(
            "mzlink-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let path = dir.join("gestures.toml");
        let _ = std::fs::remove_file(&path);

        {
            let mut store = FilePreferenceStore::open(path.clone());
            store.set("gesture_tap_3", 17).unwrap();
        }
        let reopened = FilePreferenceStore::open(path.clone());
        assert_eq!(reopened.get("gesture_tap_3"), Some(17));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
