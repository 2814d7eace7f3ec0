//! Key-value persistence and the API token store built on it.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use common::{Error, Result, TokenEntry};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Key under which the token list is stored.
pub const TOKEN_LIST_KEY: &str = "tokenList";

/// String key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.values).remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// Every write replaces the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Map::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::Storage(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No store at {}; starting empty", path.display());
                Map::new()
            }
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values)
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), Value::String(value.to_string()));
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = lock(&self.values);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// Stored API tokens. The first token is the active account.
pub trait TokenStore: Send + Sync {
    fn token_list(&self) -> Vec<TokenEntry>;
    fn add_token(&self, entry: TokenEntry) -> Result<()>;
    fn remove_all_tokens(&self) -> Result<()>;
}

/// Token list kept as JSON under [`TOKEN_LIST_KEY`] of a key-value store.
#[derive(Clone)]
pub struct StorageTokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl StorageTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl TokenStore for StorageTokenStore {
    fn token_list(&self) -> Vec<TokenEntry> {
        let Some(raw) = self.store.get(TOKEN_LIST_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                warn!("Ignoring unparseable token list: {}", e);
                Vec::new()
            }
        }
    }

    /// Add or replace the token for an account, keeping list order.
    fn add_token(&self, entry: TokenEntry) -> Result<()> {
        let mut list = self.token_list();
        match list.iter_mut().find(|t| t.account_name == entry.account_name) {
            Some(existing) => *existing = entry,
            None => list.push(entry),
        }
        self.store.set(TOKEN_LIST_KEY, &serde_json::to_string(&list)?)
    }

    fn remove_all_tokens(&self) -> Result<()> {
        self.store.remove(TOKEN_LIST_KEY)
    }
}
