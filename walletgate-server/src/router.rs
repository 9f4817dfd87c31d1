//! Router builder for the wallet protocol endpoints.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use walletgate_core::ProtocolContext;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Cross-origin policy applied to the built router.
#[derive(Debug, Clone)]
pub enum CorsPolicy {
    /// No CORS headers at all; only same-origin and non-browser callers.
    Disabled,
    /// Any origin may call. Appropriate for local development.
    Permissive,
    /// Only the listed origins may call.
    AllowList(Vec<String>),
}

/// Builder for the wallet protocol router.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use walletgate_core::{DevWallet, ProtocolConfig, ProtocolContext, WalletType};
/// use walletgate_server::WalletRouter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = ProtocolContext::new(
///     ProtocolConfig::default(),
///     WalletType::Desktop,
///     Arc::new(DevWallet::new("hunter2")),
/// );
///
/// let app = WalletRouter::new(ctx.clone()).build();
/// let listener = tokio::net::TcpListener::bind(ctx.config.bind_addr()).await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub struct WalletRouter {
    ctx: Arc<ProtocolContext>,
    cors: CorsPolicy,
}

impl WalletRouter {
    /// Create a builder over the given context. CORS defaults to
    /// permissive, matching the local-development posture.
    pub fn new(ctx: Arc<ProtocolContext>) -> Self {
        Self {
            ctx,
            cors: CorsPolicy::Permissive,
        }
    }

    /// Restrict cross-origin calls to the given origins.
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cors = CorsPolicy::AllowList(origins.into_iter().map(Into::into).collect());
        self
    }

    /// Disable CORS headers entirely.
    pub fn without_cors(mut self) -> Self {
        self.cors = CorsPolicy::Disabled;
        self
    }

    /// Build the axum router and start the context's maintenance timers.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Router {
        self.ctx.spawn_maintenance();
        let state = AppState::new(self.ctx);

        let router = Router::new()
            .route("/api/v1/wallet/status", get(handlers::wallet_status))
            .route("/api/v1/auth/request", post(handlers::auth_request))
            .route(
                "/api/v1/auth/approve/:request_id",
                get(handlers::auth_approve).post(handlers::auth_approve),
            )
            .route(
                "/api/v1/auth/deny/:request_id",
                get(handlers::auth_deny).post(handlers::auth_deny),
            )
            .route("/api/v1/auth/status/:request_id", get(handlers::auth_status))
            .route("/api/v1/auth/pending", get(handlers::auth_pending))
            .route("/api/v1/auth/revoke", post(handlers::auth_revoke))
            .route("/api/v1/wallet/info", get(handlers::wallet_info))
            .route("/api/v1/balance/:contract", get(handlers::balance))
            .route("/api/v1/transaction", post(handlers::transaction))
            .route("/api/v1/sign", post(handlers::sign_message))
            .route("/api/v1/tokens/add", post(handlers::add_token))
            .route("/api/v1/wallet/unlock", post(handlers::wallet_unlock))
            .route("/api/v1/wallet/lock", post(handlers::wallet_lock))
            .route("/ws/v1", get(ws::ws_handler))
            .with_state(state);

        match self.cors {
            CorsPolicy::Disabled => router,
            CorsPolicy::Permissive => router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
            CorsPolicy::AllowList(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|origin| match origin.parse::<HeaderValue>() {
                        Ok(value) => Some(value),
                        Err(_) => {
                            log::warn!("ignoring unparseable CORS origin: {}", origin);
                            None
                        }
                    })
                    .collect();
                router.layer(
                    CorsLayer::new()
                        .allow_origin(origins)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
            }
        }
    }
}
