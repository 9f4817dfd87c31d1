//! Capability boundary to the actual wallet.
//!
//! Key custody, signing, balance lookup, and transaction submission live
//! behind [`WalletBackend`]. The protocol core only ever reaches the wallet
//! through these calls; everything else (sessions, permissions, caching) is
//! protocol state.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ProtocolError, Result};
use crate::types::{AddTokenRequest, TransactionRequest, TransactionResult};

/// Capability calls exposed by a wallet implementation.
///
/// Implementations map their own failures to [`ProtocolError::Backend`];
/// the server surfaces those as 500s.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// The wallet's public address.
    fn address(&self) -> String;

    /// Sign an arbitrary message, returning the signature.
    async fn sign(&self, message: &str) -> Result<String>;

    /// Look up the balance held under `contract`.
    async fn balance(&self, contract: &str) -> Result<f64>;

    /// Submit a transaction to the network.
    async fn submit_transaction(&self, request: &TransactionRequest) -> Result<TransactionResult>;

    /// Register a token contract with the wallet.
    async fn add_token(&self, request: &AddTokenRequest) -> Result<()>;

    /// Check an unlock password. `Ok(false)` means wrong password;
    /// `Err` means the check itself failed.
    async fn verify_password(&self, password: &str) -> Result<bool>;
}

/// In-memory wallet for examples and tests.
///
/// Holds seeded balances, signs with a deterministic (non-cryptographic)
/// scheme, and applies `transfer` transactions to its own balance table so
/// reads visibly change after a submit.
pub struct DevWallet {
    address: String,
    password: String,
    balances: Mutex<HashMap<String, f64>>,
}

impl DevWallet {
    /// Create a wallet with a random address, the given unlock password,
    /// and 1,000,000 units of `currency`.
    pub fn new(password: impl Into<String>) -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        let mut balances = HashMap::new();
        balances.insert("currency".to_string(), 1_000_000.0);

        Self {
            address: hex::encode(bytes),
            password: password.into(),
            balances: Mutex::new(balances),
        }
    }

    /// Seed a balance directly.
    pub fn set_balance(&self, contract: &str, amount: f64) {
        self.balances.lock().insert(contract.to_string(), amount);
    }
}

#[async_trait]
impl WalletBackend for DevWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign(&self, message: &str) -> Result<String> {
        // Stand-in signature; real wallets do real cryptography here.
        Ok(format!("dev:{}:{}", &self.address[..8], hex::encode(message)))
    }

    async fn balance(&self, contract: &str) -> Result<f64> {
        Ok(self.balances.lock().get(contract).copied().unwrap_or(0.0))
    }

    async fn submit_transaction(&self, request: &TransactionRequest) -> Result<TransactionResult> {
        if request.function == "transfer" {
            let amount = request
                .kwargs
                .get("amount")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| {
                    ProtocolError::Backend("transfer requires a numeric 'amount'".to_string())
                })?;
            let mut balances = self.balances.lock();
            let entry = balances.entry(request.contract.clone()).or_insert(0.0);
            if *entry < amount {
                return Ok(TransactionResult {
                    success: false,
                    transaction_hash: None,
                    result: None,
                    errors: Some(vec!["insufficient balance".to_string()]),
                });
            }
            *entry -= amount;
        }

        Ok(TransactionResult {
            success: true,
            transaction_hash: Some(uuid::Uuid::new_v4().simple().to_string()),
            result: None,
            errors: None,
        })
    }

    async fn add_token(&self, request: &AddTokenRequest) -> Result<()> {
        self.balances
            .lock()
            .entry(request.contract_address.clone())
            .or_insert(0.0);
        Ok(())
    }

    async fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(password == self.password)
    }
}
