//! Duration-unit resolution for trade parameters.
//!
//! Works out which duration units (ticks … days) a symbol offers for a
//! trade type, backed by a per-symbol contracts cache that is persisted to
//! a key-value store and refreshed from the remote lookup when stale.

pub mod cache;
pub mod compute;
pub mod resolver;
pub mod store;
pub mod unit;

pub use cache::{CacheEntry, ContractsCache, CONTRACTS_STORE_KEY};
pub use compute::compute_durations;
pub use resolver::DurationResolver;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StorageTokenStore, TokenStore};
pub use unit::DurationUnit;
