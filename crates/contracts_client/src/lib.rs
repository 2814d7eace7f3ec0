//! Remote contract lookup.
//!
//! Provides the connection traits consumed by the duration resolver and a
//! JSON-over-WebSocket implementation of them.

pub mod api;
pub mod rate_limit;
pub mod ws;

pub use api::{ContractsApi, ContractsConnection};
pub use rate_limit::RateLimiter;
pub use ws::{BinaryWsApi, BinaryWsConnection};
