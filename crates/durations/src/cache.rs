//! Per-symbol contracts cache.
//!
//! Holds at most one entry per symbol. A new fetch replaces the entry
//! wholesale; entries are never evicted. Uses `DashMap` so background
//! refresh tasks can write while resolutions read. Concurrent writers to
//! the same symbol are not ordered: the last write wins. Writes to the
//! backing store are serialized so a persisted snapshot never drops
//! another symbol's entry.

use std::sync::{Arc, Mutex};

use common::{ContractDescriptor, TokenEntry, TradeCatalog};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use trade_options::{allowed_categories_for, AllowedCategories};

use crate::store::{lock, KeyValueStore};

/// Key under which the cache is persisted.
pub const CONTRACTS_STORE_KEY: &str = "contractsForStore";

/// Contracts fetched for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub symbol: String,
    pub available: Vec<ContractDescriptor>,
    /// Fetch time, epoch milliseconds.
    pub timestamp: i64,
    /// Account whose token authorized the fetch, if any.
    #[serde(rename = "accountName", default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

impl CacheEntry {
    pub fn new(
        symbol: &str,
        available: Vec<ContractDescriptor>,
        account_name: Option<String>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            available,
            timestamp: chrono::Utc::now().timestamp_millis(),
            account_name,
        }
    }

    /// Whole seconds elapsed since the fetch, as of `now_ms`.
    pub fn age_secs(&self, now_ms: i64) -> i64 {
        (now_ms - self.timestamp).div_euclid(1000)
    }

    pub fn is_stale(&self, now_ms: i64, ttl_secs: u64) -> bool {
        self.age_secs(now_ms) > i64::try_from(ttl_secs).unwrap_or(i64::MAX)
    }

    /// True when an account is active and the entry was fetched for a
    /// different one (or for none).
    pub fn is_account_mismatch(&self, active: Option<&TokenEntry>) -> bool {
        match active {
            Some(token) => self.account_name.as_deref() != Some(token.account_name.as_str()),
            None => false,
        }
    }
}

/// Shared contracts cache, persisted to a key-value store.
#[derive(Clone)]
pub struct ContractsCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    store: Arc<dyn KeyValueStore>,
    /// Held from snapshot to store write.
    persist_lock: Arc<Mutex<()>>,
    catalog: Arc<TradeCatalog>,
}

impl ContractsCache {
    /// Load the cache from `store`. An unparseable stored value starts an
    /// empty cache.
    pub fn load(store: Arc<dyn KeyValueStore>, catalog: Arc<TradeCatalog>) -> Self {
        let entries = DashMap::new();

        if let Some(raw) = store.get(CONTRACTS_STORE_KEY) {
            match serde_json::from_str::<Vec<CacheEntry>>(&raw) {
                Ok(list) => {
                    debug!("Loaded {} cached contract lists", list.len());
                    for entry in list {
                        entries.insert(entry.symbol.clone(), entry);
                    }
                }
                Err(e) => warn!("Discarding unparseable contracts cache: {}", e),
            }
        }

        Self {
            entries: Arc::new(entries),
            store,
            persist_lock: Arc::new(Mutex::new(())),
            catalog,
        }
    }

    pub fn catalog(&self) -> &TradeCatalog {
        &self.catalog
    }

    pub fn get(&self, symbol: &str) -> Option<CacheEntry> {
        self.entries.get(symbol).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the entry for `entry.symbol` and persist the cache.
    ///
    /// Persistence failures are logged; the in-memory entry stays. Blocks
    /// on serialization and file I/O; async callers go through
    /// [`ContractsCache::replace_blocking`].
    pub fn replace(&self, entry: CacheEntry) {
        debug!(
            "Caching {} contracts for {}",
            entry.available.len(),
            entry.symbol
        );
        self.entries.insert(entry.symbol.clone(), entry);

        if let Err(e) = self.persist() {
            warn!("Failed to persist contracts cache: {}", e);
        }
    }

    /// [`ContractsCache::replace`] on the blocking thread pool.
    pub async fn replace_blocking(&self, entry: CacheEntry) {
        let cache = self.clone();
        let symbol = entry.symbol.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || cache.replace(entry)).await {
            warn!("Cache write for {} did not complete: {}", symbol, e);
        }
    }

    fn persist(&self) -> common::Result<()> {
        let _guard = lock(&self.persist_lock);
        let mut list: Vec<CacheEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        list.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.symbol.cmp(&b.symbol)));
        let raw = serde_json::to_string(&list)?;
        self.store.set(CONTRACTS_STORE_KEY, &raw)
    }
}

impl AllowedCategories for ContractsCache {
    fn allowed_categories(&self, symbol: &str) -> Vec<String> {
        let entry = self.get(symbol).or_else(|| {
            self.entries
                .iter()
                .find(|e| e.key().eq_ignore_ascii_case(symbol))
                .map(|e| e.value().clone())
        });

        match entry {
            Some(entry) => allowed_categories_for(&entry.available, &self.catalog),
            None => Vec::new(),
        }
    }
}
