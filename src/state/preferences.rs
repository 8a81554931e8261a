//! Persisted preference store
//!
//! A flat string key-value store kept in a single JSON file in the user's
//! data directory. Missing or malformed values always degrade to built-in
//! defaults; nothing here is fatal to the session.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::session::TimerMode;

/// Name of the preference file inside the data directory
pub const PREFERENCES_FILE: &str = "preferences.json";

const DURATION_KEY_PREFIX: &str = "melodyfocus_dur_";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Preference I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preference encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Preference store lock poisoned")]
    Poisoned,
}

/// Durable key-value storage for user preferences
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
    fn remove(&self, key: &str) -> Result<(), PreferenceError>;
}

/// Preference store backed by a JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`; an absent or unreadable file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed preference file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preference file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Failed to read preference file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        Self {
            path,
            values: Mutex::new(values),
        }
    }

    /// Open `preferences.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::open(dir.join(PREFERENCES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn commit(
        &self,
        current: &mut BTreeMap<String, String>,
        next: BTreeMap<String, String>,
        key: &str,
    ) -> Result<(), PreferenceError> {
        if let Err(e) = self.flush(&next) {
            warn!("Preference {} not saved to {}: {}", key, self.path.display(), e);
            return Err(e);
        }
        *current = next;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    /// Only a change that reached disk becomes visible
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        self.commit(&mut values, next, key)
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut next = values.clone();
        next.remove(key);
        self.commit(&mut values, next, key)
    }
}

/// In-process store, used when no data directory is available and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// Per-mode countdown lengths, stored as whole minutes
#[derive(Clone)]
pub struct DurationPreferences {
    store: Arc<dyn PreferenceStore>,
}

impl DurationPreferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn key_for(mode: TimerMode) -> String {
        format!("{}{}", DURATION_KEY_PREFIX, mode.as_str())
    }

    /// Saved minutes for `mode`, if a usable value is stored
    pub fn saved_minutes(&self, mode: TimerMode) -> Option<u32> {
        let raw = match self.store.get(&Self::key_for(mode)) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read duration preference for {}: {}", mode, e);
                return None;
            }
        };

        match raw.trim().parse::<u32>() {
            Ok(minutes) if minutes > 0 => Some(minutes),
            _ => {
                warn!("Ignoring malformed duration preference for {}: {:?}", mode, raw);
                None
            }
        }
    }

    /// Countdown length for `mode`, falling back to the built-in default
    pub fn duration_seconds(&self, mode: TimerMode) -> u32 {
        self.saved_minutes(mode)
            .map(|minutes| minutes.saturating_mul(60))
            .unwrap_or_else(|| mode.default_duration_seconds())
    }

    /// Store a new length for `mode`
    pub fn set_minutes(&self, mode: TimerMode, minutes: u32) -> Result<(), PreferenceError> {
        debug!("Saving duration preference {}={}min", mode, minutes);
        self.store.set(&Self::key_for(mode), &minutes.to_string())
    }

    /// Effective minutes for every mode
    pub fn all_minutes(&self) -> BTreeMap<TimerMode, u32> {
        TimerMode::ALL
            .iter()
            .map(|mode| (*mode, self.duration_seconds(*mode) / 60))
            .collect()
    }
}

impl std::fmt::Debug for DurationPreferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurationPreferences").finish_non_exhaustive()
    }
}
