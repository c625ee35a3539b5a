use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::matcher::ai_model::ModelSettings;
use crate::resume::resume_model::ResumeData;

pub const RESUME_DATA_KEY: &str = "resumeData";
pub const MODEL_SETTINGS_KEY: &str = "modelSettings";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid JSON for '{key}': {source}")]
    Json {
        key: String,
        source: serde_json::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

// ============================================================================
// KeyValueStore trait
// ============================================================================

/// Persistent JSON key-value storage shared by the extension's contexts.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Typed read of one key.
pub fn get_typed<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Json { key: key.to_string(), source: e }),
        None => Ok(None),
    }
}

/// Typed write of one key.
pub fn set_typed<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Json { key: key.to_string(), source: e })?;
    store.set(key, value)
}

pub fn load_resume(store: &dyn KeyValueStore) -> Result<Option<ResumeData>, StoreError> {
    get_typed(store, RESUME_DATA_KEY)
}

pub fn load_model_settings(store: &dyn KeyValueStore) -> Result<Option<ModelSettings>, StoreError> {
    get_typed(store, MODEL_SETTINGS_KEY)
}

/// Everything a fill reads from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredProfile {
    pub resume: Option<ResumeData>,
    pub model_settings: Option<ModelSettings>,
}

pub fn load_profile(store: &dyn KeyValueStore) -> Result<StoredProfile, StoreError> {
    let profile = StoredProfile {
        resume: load_resume(store)?,
        model_settings: load_model_settings(store)?,
    };
    debug!(
        resume = profile.resume.is_some(),
        model_settings = profile.model_settings.is_some(),
        "stored profile loaded"
    );
    Ok(profile)
}

// ============================================================================
// Retry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Write `value` under `key`, retrying failed writes after a sleep. Returns
/// the last error once every attempt has failed.
pub fn save_with_retry(
    store: &dyn KeyValueStore,
    key: &str,
    value: &Value,
    policy: RetryPolicy,
) -> Result<(), StoreError> {
    let mut attempt = 0;
    loop {
        match store.set(key, value.clone()) {
            Ok(()) => {
                debug!(key, attempt, "store write succeeded");
                return Ok(());
            }
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                warn!(
                    "store write for '{}' failed ({}), retry {}/{} in {}ms",
                    key,
                    e,
                    attempt,
                    policy.retries,
                    policy.delay.as_millis()
                );
                std::thread::sleep(policy.delay);
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// Implementations
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Whole store kept as one JSON object on disk, rewritten on every set.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Json {
            key: self.path.display().to_string(),
            source: e,
        })
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        let json = serde_json::to_string_pretty(&entries).map_err(|e| StoreError::Json {
            key: key.to_string(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}
