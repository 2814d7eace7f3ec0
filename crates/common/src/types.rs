//! Domain and wire types shared across the workspace.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Contract Types ────────────────────────────────────────────────────

/// One offered contract variant for a symbol, as listed in the
/// `available` array of a `contracts_for` response.
///
/// Fields the resolver does not read (`sentiment`, `barriers`, ...) are
/// kept in `extra` so a cached list serializes back as it was received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    #[serde(default)]
    pub contract_category: String,
    #[serde(default)]
    pub contract_type: String,
    #[serde(default)]
    pub barrier_category: String,
    #[serde(default)]
    pub start_type: String,
    #[serde(default)]
    pub expiry_type: String,
    #[serde(default)]
    pub min_contract_duration: String,
    #[serde(default)]
    pub max_contract_duration: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContractDescriptor {
    /// Forward-starting contracts are never offered.
    pub fn is_forward_starting(&self) -> bool {
        self.start_type == "forward"
    }

    pub fn is_intraday(&self) -> bool {
        self.expiry_type == "intraday"
    }
}

/// Payload of a `contracts_for` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsFor {
    #[serde(default)]
    pub available: Vec<ContractDescriptor>,
}

/// Envelope of a `contracts_for` response. `contracts_for` is absent
/// when the server has nothing to offer for the symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsForResponse {
    #[serde(default)]
    pub contracts_for: Option<ContractsFor>,
}

impl ContractsForResponse {
    /// Contract list, if the response carried any contract data.
    pub fn into_available(self) -> Option<Vec<ContractDescriptor>> {
        self.contracts_for.map(|c| c.available)
    }
}

// ── Account Types ─────────────────────────────────────────────────────

/// Result of a successful `authorize` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizeInfo {
    #[serde(default)]
    pub loginid: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub is_virtual: u8,
}

/// A stored API token with the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub token: String,
    #[serde(default)]
    pub account_name: String,
}

// ── Market Types ──────────────────────────────────────────────────────

/// A tradable underlying from an `active_symbols` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSymbol {
    pub symbol: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub market_display_name: String,
    #[serde(default)]
    pub submarket: String,
    #[serde(default)]
    pub submarket_display_name: String,
}

// ── WebSocket Envelope ────────────────────────────────────────────────

/// Error object attached to a failed API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Fields common to every response frame.
#[derive(Debug, Clone, Deserialize)]
pub struct WsEnvelope {
    #[serde(default)]
    pub msg_type: Option<String>,
    #[serde(default)]
    pub req_id: Option<u64>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}
