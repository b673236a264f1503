use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use squeeze_core::PersistedSettings;
use squeeze_engine::{AtomicFileWriter, PersistError};
use squeeze_logging::{squeeze_debug, squeeze_info, squeeze_warn};
use thiserror::Error;

pub const KEY_SCAN_ROOTS: &str = "scan_roots";
pub const KEY_FILTER: &str = "filter";
pub const KEY_POOL_SIZE: &str = "pool_size";
pub const KEY_PLUGIN_ORDER: &str = "plugin_order";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: ron::Error,
    },
    #[error("settings path {0:?} has no file name")]
    InvalidPath(PathBuf),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Key/value store backed by one `ron` file.
///
/// Each value is kept as its own `ron` text, so one unreadable entry falls
/// back to its default without taking the others with it.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SettingsStore {
    /// Opens `path`; a missing or corrupt file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => match ron::from_str::<BTreeMap<String, String>>(&text) {
                Ok(values) => {
                    squeeze_info!("Loaded {} settings from {:?}", values.len(), path);
                    values
                }
                Err(err) => {
                    squeeze_warn!("Failed to parse settings from {:?}: {}", path, err);
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                squeeze_warn!("Failed to read settings from {:?}: {}", path, err);
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(text) = self.values.get(key) else {
            return default;
        };
        match ron::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                squeeze_warn!("Ignoring stored {}: {}", key, err);
                default
            }
        }
    }

    /// Stores `value` under `key` and rewrites the file.
    pub fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SettingsError> {
        let text = ron::to_string(value).map_err(|source| SettingsError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.values.insert(key.to_string(), text);
        self.flush()
    }

    pub fn load_settings(&self, defaults: PersistedSettings) -> PersistedSettings {
        PersistedSettings {
            scan_roots: self.load(KEY_SCAN_ROOTS, defaults.scan_roots),
            filter: self.load(KEY_FILTER, defaults.filter),
            pool_size: self.load(KEY_POOL_SIZE, defaults.pool_size),
            plugin_order: self.load(KEY_PLUGIN_ORDER, defaults.plugin_order),
        }
    }

    pub fn save_settings(&mut self, settings: &PersistedSettings) -> Result<(), SettingsError> {
        for (key, text) in [
            (KEY_SCAN_ROOTS, ron::to_string(&settings.scan_roots)),
            (KEY_FILTER, ron::to_string(&settings.filter)),
            (KEY_POOL_SIZE, ron::to_string(&settings.pool_size)),
            (KEY_PLUGIN_ORDER, ron::to_string(&settings.plugin_order)),
        ] {
            let text = text.map_err(|source| SettingsError::Serialize {
                key: key.to_string(),
                source,
            })?;
            self.values.insert(key.to_string(), text);
        }
        self.flush()
    }

    fn flush(&self) -> Result<(), SettingsError> {
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SettingsError::InvalidPath(self.path.clone()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&self.values, pretty).map_err(|source| {
            SettingsError::Serialize {
                key: "*".to_string(),
                source,
            }
        })?;
        AtomicFileWriter::new(dir).write(filename, content)?;
        squeeze_debug!("Saved {} settings to {:?}", self.values.len(), self.path);
        Ok(())
    }
}
