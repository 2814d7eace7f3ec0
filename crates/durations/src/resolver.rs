//! Duration resolver: cache policy over the remote contract lookup.
//!
//! For a cached symbol the entry is served as long as it belongs to the
//! active account. A stale entry is still served, and a detached task
//! refreshes it in the background. An entry fetched for another account
//! (or anonymously, once an account is active) is never served: the
//! caller waits for a fresh fetch instead.
//!
//! Background refreshes are tracked by the resolver. A short-lived process
//! calls [`DurationResolver::wait_for_refreshes`] before its runtime shuts
//! down so refreshes are not aborted mid-fetch.

use std::sync::{Arc, Mutex};

use common::{ContractDescriptor, Result, TokenEntry};
use contracts_client::ContractsApi;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, ContractsCache};
use crate::compute::compute_durations;
use crate::store::{lock, TokenStore};
use crate::unit::DurationUnit;

/// Resolves offered duration units per (symbol, trade type).
///
/// Cheap to clone; clones share the cache and the in-flight refresh set.
#[derive(Clone)]
pub struct DurationResolver {
    api: Arc<dyn ContractsApi>,
    tokens: Arc<dyn TokenStore>,
    cache: ContractsCache,
    ttl_secs: u64,
    /// Symbols with a background refresh in flight.
    refreshing: Arc<DashMap<String, ()>>,
    /// Handles of spawned refreshes not yet awaited.
    refresh_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

/// Clears a symbol's in-flight marker when the refresh task ends, however
/// it ends.
struct RefreshGuard {
    refreshing: Arc<DashMap<String, ()>>,
    symbol: String,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.refreshing.remove(&self.symbol);
    }
}

impl DurationResolver {
    pub fn new(
        api: Arc<dyn ContractsApi>,
        tokens: Arc<dyn TokenStore>,
        cache: ContractsCache,
        ttl_secs: u64,
    ) -> Self {
        Self {
            api,
            tokens,
            cache,
            ttl_secs,
            refreshing: Arc::new(DashMap::new()),
            refresh_tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn cache(&self) -> &ContractsCache {
        &self.cache
    }

    pub fn is_refreshing(&self, symbol: &str) -> bool {
        self.refreshing.contains_key(symbol)
    }

    /// Duration units offered for `trade_type` on `symbol`, ascending.
    ///
    /// Falls back to every unit when the lookup has no contract data.
    pub async fn resolve_durations(
        &self,
        symbol: &str,
        trade_type: &str,
    ) -> Result<Vec<DurationUnit>> {
        let contracts = self.contracts_for(symbol).await?;
        Ok(compute_durations(
            contracts.as_deref().unwrap_or_default(),
            trade_type,
            self.cache.catalog(),
        ))
    }

    /// Contract list for `symbol` under the cache policy.
    ///
    /// `None` means the lookup returned no contract data.
    pub async fn contracts_for(&self, symbol: &str) -> Result<Option<Vec<ContractDescriptor>>> {
        let tokens = self.tokens.token_list();

        if let Some(entry) = self.cache.get(symbol) {
            if entry.is_account_mismatch(tokens.first()) {
                info!(
                    "Cached contracts for {} belong to another account; refetching",
                    symbol
                );
                return self.fetch_and_cache(symbol, &tokens).await;
            }

            let now_ms = chrono::Utc::now().timestamp_millis();
            if entry.is_stale(now_ms, self.ttl_secs) {
                debug!(
                    "Cached contracts for {} are {}s old; serving and refreshing",
                    symbol,
                    entry.age_secs(now_ms)
                );
                self.spawn_refresh(symbol, tokens);
            } else {
                debug!("Cache hit for {}", symbol);
            }

            return Ok(Some(entry.available));
        }

        self.fetch_and_cache(symbol, &tokens).await
    }

    /// Start a background refresh of `symbol` unless one is already
    /// running. Returns whether a task was spawned.
    ///
    /// The task's result only lands in the cache. An awaited fetch for the
    /// same symbol may finish on either side of it; the later write wins.
    pub fn spawn_refresh(&self, symbol: &str, tokens: Vec<TokenEntry>) -> bool {
        if self.refreshing.insert(symbol.to_string(), ()).is_some() {
            debug!("Refresh for {} already in flight", symbol);
            return false;
        }

        let guard = RefreshGuard {
            refreshing: self.refreshing.clone(),
            symbol: symbol.to_string(),
        };
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let symbol = guard.symbol.clone();
            if let Err(e) = this.fetch_and_cache(&symbol, &tokens).await {
                warn!("Background refresh for {} failed: {}", symbol, e);
            }
            drop(guard);
        });

        let mut tasks = lock(&self.refresh_tasks);
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
        true
    }

    /// Wait for every background refresh, including ones started while
    /// waiting.
    pub async fn wait_for_refreshes(&self) {
        loop {
            let pending = std::mem::take(&mut *lock(&self.refresh_tasks));
            if pending.is_empty() {
                return;
            }
            debug!("Waiting on {} background refreshes", pending.len());
            for handle in pending {
                if let Err(e) = handle.await {
                    warn!("Background refresh task failed: {}", e);
                }
            }
        }
    }

    /// Fetch contracts for `symbol` and replace its cache entry.
    ///
    /// Authorizes with the first of `tokens` when there is one; a failed
    /// authorization clears the token store and the fetch continues
    /// anonymously. The connection is closed on every path once opened.
    pub async fn fetch_and_cache(
        &self,
        symbol: &str,
        tokens: &[TokenEntry],
    ) -> Result<Option<Vec<ContractDescriptor>>> {
        let mut conn = self.api.connect().await?;

        let mut account_name = None;
        if let Some(token) = tokens.first() {
            match conn.authorize(&token.token).await {
                Ok(_) => account_name = Some(token.account_name.clone()),
                Err(e) => {
                    warn!(
                        "Authorization for {} failed ({}); clearing stored tokens",
                        token.account_name, e
                    );
                    if let Err(e) = self.tokens.remove_all_tokens() {
                        warn!("Failed to clear stored tokens: {}", e);
                    }
                }
            }
        }

        let response = conn.contracts_for(symbol).await;
        conn.disconnect().await;

        let Some(available) = response?.into_available() else {
            info!("No contract data for {}", symbol);
            return Ok(None);
        };

        info!(
            "Fetched {} contracts for {} ({})",
            available.len(),
            symbol,
            account_name.as_deref().unwrap_or("anonymous")
        );
        self.cache
            .replace_blocking(CacheEntry::new(symbol, available.clone(), account_name))
            .await;
        Ok(Some(available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use common::{
        ActiveSymbol, AuthorizeInfo, ContractsFor, ContractsForResponse, Error, TradeCatalog,
    };
    use contracts_client::ContractsConnection;

    use crate::store::{JsonFileStore, KeyValueStore, MemoryStore, StorageTokenStore};

    #[derive(Default)]
    struct MockState {
        connects: AtomicUsize,
        authorizes: AtomicUsize,
        queries: AtomicUsize,
        disconnects: AtomicUsize,
        fail_connect: bool,
        fail_auth: bool,
        delay_ms: u64,
        /// Responses served in order; `Err` entries fail the query.
        responses: Mutex<VecDeque<std::result::Result<Option<Vec<ContractDescriptor>>, String>>>,
    }

    #[derive(Clone, Default)]
    struct MockApi {
        state: Arc<MockState>,
    }

    impl MockApi {
        fn with_state(state: MockState) -> Self {
            Self {
                state: Arc::new(state),
            }
        }

        fn push(&self, response: Option<Vec<ContractDescriptor>>) {
            self.state.responses.lock().unwrap().push_back(Ok(response));
        }

        fn push_err(&self, message: &str) {
            self.state
                .responses
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
        }

        fn connects(&self) -> usize {
            self.state.connects.load(Ordering::SeqCst)
        }

        fn disconnects(&self) -> usize {
            self.state.disconnects.load(Ordering::SeqCst)
        }
    }

    struct MockConnection {
        state: Arc<MockState>,
    }

    #[async_trait]
    impl ContractsApi for MockApi {
        async fn connect(&self) -> Result<Box<dyn ContractsConnection>> {
            self.state.connects.fetch_add(1, Ordering::SeqCst);
            if self.state.fail_connect {
                return Err(Error::WebSocket("connection refused".into()));
            }
            Ok(Box::new(MockConnection {
                state: self.state.clone(),
            }))
        }
    }

    #[async_trait]
    impl ContractsConnection for MockConnection {
        async fn authorize(&mut self, _token: &str) -> Result<AuthorizeInfo> {
            self.state.authorizes.fetch_add(1, Ordering::SeqCst);
            if self.state.fail_auth {
                return Err(Error::Api {
                    code: "InvalidToken".into(),
                    message: "The token is invalid.".into(),
                });
            }
            Ok(AuthorizeInfo::default())
        }

        async fn contracts_for(&mut self, _symbol: &str) -> Result<ContractsForResponse> {
            self.state.queries.fetch_add(1, Ordering::SeqCst);
            if self.state.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.state.delay_ms)).await;
            }
            let next = self.state.responses.lock().unwrap().pop_front();
            match next {
                Some(Ok(available)) => Ok(ContractsForResponse {
                    contracts_for: available.map(|available| ContractsFor { available }),
                }),
                Some(Err(message)) => Err(Error::WebSocket(message)),
                None => Ok(ContractsForResponse::default()),
            }
        }

        async fn active_symbols(&mut self) -> Result<Vec<ActiveSymbol>> {
            Ok(Vec::new())
        }

        async fn disconnect(self: Box<Self>) {
            self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn contract(min: &str, max: &str) -> ContractDescriptor {
        ContractDescriptor {
            contract_category: "callput".into(),
            contract_type: "CALL".into(),
            barrier_category: "euro_atm".into(),
            start_type: "spot".into(),
            expiry_type: "intraday".into(),
            min_contract_duration: min.into(),
            max_contract_duration: max.into(),
            ..Default::default()
        }
    }

    fn token(token: &str, account: &str) -> TokenEntry {
        TokenEntry {
            token: token.into(),
            account_name: account.into(),
        }
    }

    struct Fixture {
        api: MockApi,
        tokens: Arc<StorageTokenStore>,
        resolver: DurationResolver,
    }

    fn fixture(api: MockApi) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(StorageTokenStore::new(store.clone()));
        let cache = ContractsCache::load(store, Arc::new(TradeCatalog::default()));
        let resolver = DurationResolver::new(Arc::new(api.clone()), tokens.clone(), cache, 600);
        Fixture {
            api,
            tokens,
            resolver,
        }
    }

    fn aged_entry(
        symbol: &str,
        available: Vec<ContractDescriptor>,
        account: Option<&str>,
        age_secs: i64,
    ) -> CacheEntry {
        let mut entry = CacheEntry::new(symbol, available, account.map(str::to_string));
        entry.timestamp -= age_secs * 1000;
        entry
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let f = fixture(MockApi::default());
        f.api.push(Some(vec![contract("5t", "1d")]));

        let units = f
            .resolver
            .resolve_durations("frxUSDJPY", "risefall")
            .await
            .unwrap();
        assert_eq!(
            units,
            vec![
                DurationUnit::Ticks,
                DurationUnit::Seconds,
                DurationUnit::Minutes,
                DurationUnit::Hours,
            ]
        );
        assert_eq!(f.api.connects(), 1);
        assert_eq!(f.api.disconnects(), 1);
        let entry = f.resolver.cache().get("frxUSDJPY").unwrap();
        assert_eq!(entry.available.len(), 1);
        assert!(entry.account_name.is_none());
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_lookup() {
        let f = fixture(MockApi::default());
        f.resolver
            .cache()
            .replace(aged_entry("frxUSDJPY", vec![contract("1m", "2h")], None, 30));

        let units = f
            .resolver
            .resolve_durations("frxUSDJPY", "risefall")
            .await
            .unwrap();
        assert_eq!(units, vec![DurationUnit::Minutes, DurationUnit::Hours]);
        assert_eq!(f.api.connects(), 0);
        assert!(!f.resolver.is_refreshing("frxUSDJPY"));
    }

    #[tokio::test]
    async fn test_stale_entry_served_then_refreshed_once() {
        let f = fixture(MockApi::with_state(MockState {
            delay_ms: 20,
            ..Default::default()
        }));
        f.resolver
            .cache()
            .replace(aged_entry("R_100", vec![contract("1m", "2h")], None, 601));
        f.api.push(Some(vec![contract("5t", "10t")]));

        let first = f.resolver.resolve_durations("R_100", "risefall").await.unwrap();
        let second = f.resolver.resolve_durations("R_100", "risefall").await.unwrap();
        assert_eq!(first, vec![DurationUnit::Minutes, DurationUnit::Hours]);
        assert_eq!(second, first);
        assert!(f.resolver.is_refreshing("R_100"));

        f.resolver.wait_for_refreshes().await;
        assert!(!f.resolver.is_refreshing("R_100"));
        assert_eq!(f.api.connects(), 1);
        assert_eq!(f.api.disconnects(), 1);

        let refreshed = f.resolver.resolve_durations("R_100", "risefall").await.unwrap();
        assert_eq!(refreshed, vec![DurationUnit::Ticks]);
        assert_eq!(f.api.connects(), 1);
    }

    #[tokio::test]
    async fn test_account_mismatch_refetches() {
        let f = fixture(MockApi::default());
        f.tokens.add_token(token("tok-b", "CR200")).unwrap();
        f.resolver.cache().replace(aged_entry(
            "frxUSDJPY",
            vec![contract("1m", "2h")],
            Some("CR100"),
            10,
        ));
        f.api.push(Some(vec![contract("5t", "10t")]));

        let units = f
            .resolver
            .resolve_durations("frxUSDJPY", "risefall")
            .await
            .unwrap();
        assert_eq!(units, vec![DurationUnit::Ticks]);
        assert_eq!(f.api.connects(), 1);
        assert_eq!(f.api.state.authorizes.load(Ordering::SeqCst), 1);
        let entry = f.resolver.cache().get("frxUSDJPY").unwrap();
        assert_eq!(entry.account_name.as_deref(), Some("CR200"));
    }

    #[tokio::test]
    async fn test_anonymous_entry_refetched_once_logged_in() {
        let f = fixture(MockApi::default());
        f.resolver
            .cache()
            .replace(aged_entry("R_50", vec![contract("1m", "2h")], None, 10));
        f.tokens.add_token(token("tok-a", "CR100")).unwrap();
        f.api.push(Some(vec![contract("1s", "30s")]));

        let units = f.resolver.resolve_durations("R_50", "risefall").await.unwrap();
        assert_eq!(units, vec![DurationUnit::Seconds]);
        assert_eq!(f.api.connects(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_clears_tokens_and_continues() {
        let f = fixture(MockApi::with_state(MockState {
            fail_auth: true,
            ..Default::default()
        }));
        f.tokens.add_token(token("expired", "CR100")).unwrap();
        f.api.push(Some(vec![contract("5t", "10t")]));

        let units = f.resolver.resolve_durations("R_100", "risefall").await.unwrap();
        assert_eq!(units, vec![DurationUnit::Ticks]);
        assert!(f.tokens.token_list().is_empty());
        assert!(f.resolver.cache().get("R_100").unwrap().account_name.is_none());
        assert_eq!(f.api.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_no_contract_data_falls_back_without_caching() {
        let f = fixture(MockApi::default());
        f.api.push(None);

        let units = f.resolver.resolve_durations("R_100", "risefall").await.unwrap();
        assert_eq!(units, DurationUnit::ALL.to_vec());
        assert!(f.resolver.cache().get("R_100").is_none());
        assert_eq!(f.api.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_query_error_propagates_and_disconnects() {
        let f = fixture(MockApi::default());
        f.api.push_err("socket reset");

        let err = f
            .resolver
            .resolve_durations("R_100", "risefall")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WebSocket(_)));
        assert_eq!(f.api.disconnects(), 1);
        assert!(f.resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_connect_error_propagates() {
        let f = fixture(MockApi::with_state(MockState {
            fail_connect: true,
            ..Default::default()
        }));

        let result = f.resolver.resolve_durations("R_100", "risefall").await;
        assert!(result.is_err());
        assert_eq!(f.api.disconnects(), 0);
    }

    #[tokio::test]
    async fn test_forward_contracts_never_offered() {
        let f = fixture(MockApi::default());
        let mut forward = contract("1t", "365d");
        forward.start_type = "forward".into();
        forward.expiry_type = "daily".into();
        f.api.push(Some(vec![forward, contract("1m", "1h")]));

        let units = f.resolver.resolve_durations("R_100", "risefall").await.unwrap();
        assert_eq!(units, vec![DurationUnit::Minutes, DurationUnit::Hours]);
    }

    fn stale_fixture(delay_ms: u64) -> Fixture {
        let f = fixture(MockApi::with_state(MockState {
            delay_ms,
            ..Default::default()
        }));
        f.resolver
            .cache()
            .replace(aged_entry("R_100", vec![contract("1m", "2h")], None, 601));
        f.api.push(Some(vec![contract("5t", "10t")]));
        f
    }

    #[test]
    fn test_refresh_finishes_before_runtime_shutdown() {
        let f = stale_fixture(50);
        let rt = tokio::runtime::Runtime::new().unwrap();

        let served = rt
            .block_on(f.resolver.resolve_durations("R_100", "risefall"))
            .unwrap();
        rt.block_on(f.resolver.wait_for_refreshes());
        drop(rt);

        assert_eq!(served, vec![DurationUnit::Minutes, DurationUnit::Hours]);
        assert_eq!(f.api.connects(), 1);
        assert_eq!(f.api.disconnects(), 1);
        assert!(!f.resolver.is_refreshing("R_100"));
        let entry = f.resolver.cache().get("R_100").unwrap();
        assert_eq!(entry.available[0].min_contract_duration, "5t");
    }

    #[test]
    fn test_aborted_refresh_clears_marker() {
        let f = stale_fixture(5_000);
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(f.resolver.resolve_durations("R_100", "risefall"))
            .unwrap();
        assert!(f.resolver.is_refreshing("R_100"));
        drop(rt);

        assert!(!f.resolver.is_refreshing("R_100"));
        assert_eq!(
            f.resolver.cache().get("R_100").unwrap().available[0].min_contract_duration,
            "1m"
        );
    }

    #[tokio::test]
    async fn test_wait_for_refreshes_without_tasks() {
        let f = fixture(MockApi::default());
        f.resolver.wait_for_refreshes().await;
        assert_eq!(f.api.connects(), 0);
    }

    #[tokio::test]
    async fn test_stale_mismatched_entry_is_refetched_not_served() {
        let f = fixture(MockApi::default());
        f.tokens.add_token(token("tok-b", "CR200")).unwrap();
        f.resolver.cache().replace(aged_entry(
            "R_100",
            vec![contract("1m", "2h")],
            Some("CR100"),
            601,
        ));
        f.api.push(Some(vec![contract("5t", "10t")]));

        let units = f.resolver.resolve_durations("R_100", "risefall").await.unwrap();
        assert_eq!(units, vec![DurationUnit::Ticks]);
        assert!(!f.resolver.is_refreshing("R_100"));

        f.resolver.wait_for_refreshes().await;
        assert_eq!(f.api.connects(), 1);
        assert_eq!(f.api.state.queries.load(Ordering::SeqCst), 1);
        let entry = f.resolver.cache().get("R_100").unwrap();
        assert_eq!(entry.account_name.as_deref(), Some("CR200"));
    }

    fn file_resolver(path: &std::path::Path, api: &MockApi) -> DurationResolver {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(path).unwrap());
        let tokens = Arc::new(StorageTokenStore::new(store.clone()));
        let cache = ContractsCache::load(store, Arc::new(TradeCatalog::default()));
        DurationResolver::new(Arc::new(api.clone()), tokens, cache, 600)
    }

    #[tokio::test]
    async fn test_cache_file_served_by_next_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let first_api = MockApi::default();
        first_api.push(Some(vec![contract("1s", "1h")]));
        let first = file_resolver(&path, &first_api);
        let units = first.resolve_durations("frxUSDJPY", "risefall").await.unwrap();
        assert_eq!(first_api.connects(), 1);

        let second_api = MockApi::default();
        let second = file_resolver(&path, &second_api);
        let again = second.resolve_durations("frxUSDJPY", "risefall").await.unwrap();
        second.wait_for_refreshes().await;

        assert_eq!(again, units);
        assert_eq!(
            again,
            vec![
                DurationUnit::Seconds,
                DurationUnit::Minutes,
                DurationUnit::Hours
            ]
        );
        assert_eq!(second_api.connects(), 0);
    }
}
