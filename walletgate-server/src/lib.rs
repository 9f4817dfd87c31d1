//! HTTP and WebSocket server for the walletgate protocol.
//!
//! This crate exposes a [`walletgate_core::ProtocolContext`] over the wire
//! contract: REST endpoints for the authorization handshake and wallet
//! operations, plus a `/ws/v1` push channel for lifecycle events.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use walletgate_core::{DevWallet, ProtocolConfig, ProtocolContext, WalletType};
//! use walletgate_server::WalletRouter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = ProtocolContext::new(
//!     ProtocolConfig::default(),
//!     WalletType::Desktop,
//!     Arc::new(DevWallet::new("hunter2")),
//! );
//!
//! let app = WalletRouter::new(ctx.clone()).build();
//! let listener = tokio::net::TcpListener::bind(ctx.config.bind_addr()).await?;
//! axum::serve(listener, app).await?;
//!
//! // On the way out, cancel the background timers.
//! ctx.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub(crate) mod handlers;
pub mod router;
pub(crate) mod state;
pub(crate) mod ws;

// Re-exports
pub use error::{ServerError, ServerResult};
pub use router::{CorsPolicy, WalletRouter};
