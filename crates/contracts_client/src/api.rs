//! Connection traits for the remote contract lookup.

use async_trait::async_trait;
use common::{ActiveSymbol, AuthorizeInfo, ContractsForResponse, Result};

/// Opens short-lived connections to the contract lookup service.
#[async_trait]
pub trait ContractsApi: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ContractsConnection>>;
}

/// A single open connection. Callers must `disconnect` it once done,
/// whatever the outcome of the queries made on it.
#[async_trait]
pub trait ContractsConnection: Send {
    /// Authorize the connection with an API token.
    async fn authorize(&mut self, token: &str) -> Result<AuthorizeInfo>;

    /// Contracts offered for an underlying symbol.
    async fn contracts_for(&mut self, symbol: &str) -> Result<ContractsForResponse>;

    /// Currently tradable underlyings.
    async fn active_symbols(&mut self) -> Result<Vec<ActiveSymbol>>;

    /// Close the connection. Errors are logged, not returned.
    async fn disconnect(self: Box<Self>);
}
