//! Shared types, config, catalog, and error definitions.

pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::{CategoryGroup, OppositeChoice, OppositeSet, TradeCatalog};
pub use config::ResolverConfig;
pub use error::Error;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
