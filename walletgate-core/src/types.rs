//! Wire models shared by the server and client.
//!
//! Field names follow the HTTP contract exactly; everything here is plain
//! serde data with no behavior beyond small constructors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permission::PermissionSet;

/// Kind of wallet hosting the protocol server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletType {
    Desktop,
    Web,
    Cli,
    Hardware,
}

impl std::fmt::Display for WalletType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Desktop => "desktop",
            Self::Web => "web",
            Self::Cli => "cli",
            Self::Hardware => "hardware",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// Body of `POST /api/v1/auth/request`.
///
/// Permissions arrive as raw strings so unknown values can be rejected with
/// the protocol's own error rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequestPayload {
    pub app_name: String,
    pub app_url: String,
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Optional body of `POST /api/v1/auth/approve/{request_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovePayload {
    /// Narrowed grant; omitted means "grant everything requested".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

/// Response of a successful approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    pub permissions: PermissionSet,
    pub status: AuthStatus,
}

/// Response of `GET /api/v1/auth/status/{request_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub request_id: String,
    pub status: AuthStatus,
    pub permissions: PermissionSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// Response of `GET /api/v1/wallet/status`. Requires no authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub available: bool,
    pub locked: bool,
    pub wallet_type: WalletType,
    pub network: String,
    pub chain_id: String,
    pub version: String,
}

/// Response of `GET /api/v1/wallet/info`. Requires `wallet_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub address: String,
    pub truncated_address: String,
    pub locked: bool,
    pub chain_id: String,
    pub network: String,
    pub wallet_type: WalletType,
    pub version: String,
}

impl WalletInfo {
    /// Shorten an address for display: first eight and last four characters.
    pub fn truncate_address(address: &str) -> String {
        if address.len() <= 12 {
            return address.to_string();
        }
        format!("{}...{}", &address[..8], &address[address.len() - 4..])
    }
}

/// Body of `POST /api/v1/transaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub contract: String,
    pub function: String,
    pub kwargs: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamps_supplied: Option<u64>,
}

/// Result of a submitted transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// Body of `POST /api/v1/sign`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignMessageRequest {
    pub message: String,
}

/// Response of `POST /api/v1/sign`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureResponse {
    pub message: String,
    pub signature: String,
    pub signer: String,
}

/// Response of `GET /api/v1/balance/{contract}`. Served through the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: f64,
    pub contract: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// Body of `POST /api/v1/tokens/add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTokenRequest {
    pub contract_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

/// Body of `POST /api/v1/wallet/unlock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}
