//! # walletgate-client
//!
//! App-side client for the walletgate protocol. [`WalletClient`] drives the
//! authorization handshake against a wallet server, holds the issued
//! session token, and exposes the permissioned wallet operations.
//! [`WalletClientSync`] wraps the same client for synchronous callers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use walletgate_client::WalletClient;
//!
//! # async fn example() -> Result<(), walletgate_client::ClientError> {
//! let client = WalletClient::builder()
//!     .base_url("http://127.0.0.1:8545")
//!     .app_name("Demo DApp")
//!     .app_url("https://demo.example")
//!     .permissions(["wallet_info", "balance", "transactions"])
//!     .build()?;
//!
//! // Blocks until the user approves or denies on the wallet side.
//! let info = client.connect().await?;
//! println!("connected to {}", info.truncated_address);
//!
//! let balance = client.balance("currency").await?;
//! println!("balance: {}", balance.balance);
//!
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod error;

pub use blocking::WalletClientSync;
pub use client::{WalletClient, WalletClientBuilder};
pub use error::ClientError;

// Wire models callers need to drive the client.
pub use walletgate_core::{
    AddTokenRequest, AuthStatus, BalanceResponse, SignatureResponse, StatusResponse,
    TransactionRequest, TransactionResult, WalletInfo, WalletType,
};
