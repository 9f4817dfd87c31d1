//! # walletgate-core
//!
//! Core primitives of the walletgate protocol: a local authorization broker
//! that lets untrusted apps obtain scoped, time-limited access to a wallet
//! backend only after an out-of-band, user-mediated approval step.
//!
//! The crate is transport-agnostic. `walletgate-server` exposes these
//! components over HTTP and a WebSocket push channel; `walletgate-client`
//! drives the handshake from the app side.
//!
//! ## Components
//!
//! - [`AuthorizationRegistry`] - the request -> approve/deny -> session
//!   state machine
//! - [`SessionManager`] - issuance, validation, FIFO capacity eviction,
//!   revocation, and the wallet lock/auto-lock lifecycle
//! - [`PermissionEnforcer`] - the scope gate every permissioned operation
//!   passes through
//! - [`ResponseCache`] - single-flight, TTL-bound memoizer for reads
//! - [`EventBroadcaster`] - fan-out channel behind the push endpoint
//! - [`WalletBackend`] - the capability boundary to actual key custody
//! - [`ProtocolContext`] - one object owning all of the above, with an
//!   explicit init/shutdown lifecycle
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use walletgate_core::{
//!     DevWallet, PermissionSet, ProtocolConfig, ProtocolContext, WalletType,
//! };
//!
//! # fn main() -> walletgate_core::Result<()> {
//! let ctx = ProtocolContext::new(
//!     ProtocolConfig::default(),
//!     WalletType::Desktop,
//!     Arc::new(DevWallet::new("hunter2")),
//! );
//!
//! // An app asks for access...
//! let permissions = PermissionSet::from_strs(&["wallet_info", "balance"])?;
//! let request_id =
//!     ctx.registry
//!         .create_request("Demo DApp", "https://demo.example", permissions, None)?;
//!
//! // ...the user approves, and a scoped session exists.
//! let session = ctx.registry.approve(&request_id, None)?;
//! assert!(ctx.sessions.validate(&session.token).is_ok());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod permission;
pub mod registry;
pub mod session;
pub mod types;

pub use backend::{DevWallet, WalletBackend};
pub use cache::ResponseCache;
pub use config::{ProtocolConfig, DEFAULT_HOST, DEFAULT_PORT, PROTOCOL_VERSION};
pub use context::ProtocolContext;
pub use error::{ProtocolError, Result};
pub use events::{EventBroadcaster, EventListener, ListenerId, Pong, WalletEvent};
pub use permission::{Permission, PermissionEnforcer, PermissionSet, WalletLockState};
pub use registry::{AuthorizationRegistry, PendingAuthorization};
pub use session::{Session, SessionManager};
pub use types::{
    AddTokenRequest, ApprovePayload, AuthRequestPayload, AuthStatus, AuthStatusResponse,
    AuthorizationResponse, BalanceResponse, SignMessageRequest, SignatureResponse, StatusResponse,
    TransactionRequest, TransactionResult, UnlockRequest, WalletInfo, WalletType,
};
