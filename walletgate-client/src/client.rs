//! Async wallet client.
//!
//! [`WalletClient::connect`] drives the whole handshake: check the wallet is
//! up and unlocked, submit an authorization request, poll until the user
//! decides, then hold the issued session token for every later call.

use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use walletgate_core::{
    AddTokenRequest, AuthRequestPayload, AuthStatus, AuthStatusResponse, BalanceResponse,
    SignMessageRequest, SignatureResponse, StatusResponse, TransactionRequest, TransactionResult,
    WalletInfo,
};

use crate::error::{ApiErrorBody, ClientError};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause between approval polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of approval polls before giving up.
const DEFAULT_POLL_ATTEMPTS: u32 = 150;

#[derive(Debug, Deserialize)]
struct AuthRequestAck {
    request_id: String,
}

/// Async client for a walletgate server.
pub struct WalletClient {
    http: reqwest::Client,
    base_url: String,
    app_name: String,
    app_url: String,
    permissions: Vec<String>,
    description: Option<String>,
    poll_interval: Duration,
    poll_attempts: u32,
    token: Mutex<Option<String>>,
}

impl std::fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletClient")
            .field("base_url", &self.base_url)
            .field("app_name", &self.app_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl WalletClient {
    /// Create a builder for the client.
    pub fn builder() -> WalletClientBuilder {
        WalletClientBuilder::new()
    }

    /// True when a session token is held. Says nothing about whether the
    /// server still honors it; a stale token surfaces as
    /// [`ClientError::NotConnected`] on the next call.
    pub fn is_connected(&self) -> bool {
        self.token.lock().is_some()
    }

    /// The current session token, if any.
    pub fn session_token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    /// `GET /api/v1/wallet/status` - reachability and lock state. Needs no
    /// session.
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        let response = self
            .http
            .get(self.url("/api/v1/wallet/status"))
            .send()
            .await
            .map_err(|e| ClientError::Unavailable(e.to_string()))?;
        self.parse_json(response).await
    }

    /// Run the authorization handshake and return the wallet's info once a
    /// session exists.
    ///
    /// Fails with [`ClientError::Unavailable`] when the wallet is not
    /// reachable, [`ClientError::Locked`] when it is locked,
    /// [`ClientError::Denied`] when the user rejects the request, and
    /// [`ClientError::Timeout`] when the request expires or polling runs
    /// out of attempts.
    pub async fn connect(&self) -> Result<WalletInfo, ClientError> {
        let status = self.status().await?;
        if status.locked {
            return Err(ClientError::Locked);
        }

        let payload = AuthRequestPayload {
            app_name: self.app_name.clone(),
            app_url: self.app_url.clone(),
            permissions: self.permissions.clone(),
            description: self.description.clone(),
        };
        let response = self
            .http
            .post(self.url("/api/v1/auth/request"))
            .json(&payload)
            .send()
            .await?;
        let ack: AuthRequestAck = self.parse_json(response).await?;
        log::debug!(
            "authorization request {} submitted for {}, awaiting approval",
            ack.request_id,
            self.app_name
        );

        for attempt in 0..self.poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.poll_interval).await;
            }

            let response = self
                .http
                .get(self.url(&format!("/api/v1/auth/status/{}", ack.request_id)))
                .send()
                .await?;
            let poll: AuthStatusResponse = self.parse_json(response).await?;

            match poll.status {
                AuthStatus::Pending => continue,
                AuthStatus::Approved => {
                    let token = poll.session_token.ok_or_else(|| {
                        ClientError::InvalidResponse(
                            "approved status carried no session token".into(),
                        )
                    })?;
                    *self.token.lock() = Some(token);
                    log::info!("authorization {} approved", ack.request_id);
                    return self.wallet_info().await;
                }
                AuthStatus::Denied => return Err(ClientError::Denied),
                AuthStatus::Expired => return Err(ClientError::Timeout),
            }
        }

        Err(ClientError::Timeout)
    }

    /// `GET /api/v1/wallet/info` - needs the `wallet_info` permission.
    pub async fn wallet_info(&self) -> Result<WalletInfo, ClientError> {
        self.get_authed("/api/v1/wallet/info").await
    }

    /// `GET /api/v1/balance/{contract}` - needs the `balance` permission.
    pub async fn balance(&self, contract: &str) -> Result<BalanceResponse, ClientError> {
        self.get_authed(&format!("/api/v1/balance/{}", contract)).await
    }

    /// `POST /api/v1/transaction` - needs the `transactions` permission.
    pub async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransactionResult, ClientError> {
        self.post_authed("/api/v1/transaction", request).await
    }

    /// `POST /api/v1/sign` - needs the `sign_message` permission.
    pub async fn sign_message(&self, message: &str) -> Result<SignatureResponse, ClientError> {
        let payload = SignMessageRequest {
            message: message.to_string(),
        };
        self.post_authed("/api/v1/sign", &payload).await
    }

    /// `POST /api/v1/tokens/add` - needs the `add_token` permission.
    pub async fn add_token(&self, request: &AddTokenRequest) -> Result<(), ClientError> {
        let _: serde_json::Value = self.post_authed("/api/v1/tokens/add", request).await?;
        Ok(())
    }

    /// Revoke the session on the server and forget the token locally.
    ///
    /// Idempotent: disconnecting without a session, or with one the server
    /// already revoked, is not an error.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let Some(token) = self.token.lock().take() else {
            return Ok(());
        };

        let response = self
            .http
            .post(self.url("/api/v1/auth/revoke"))
            .bearer_auth(&token)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() || status.as_u16() == 401 {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.classify_error(status.as_u16(), &body))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_authed<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let token = self.bearer()?;
        let response = self.http.get(self.url(path)).bearer_auth(token).send().await?;
        self.parse_json(response).await
    }

    async fn post_authed<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let token = self.bearer()?;
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        self.parse_json(response).await
    }

    fn bearer(&self) -> Result<String, ClientError> {
        self.token.lock().clone().ok_or(ClientError::NotConnected)
    }

    async fn parse_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::InvalidResponse(format!("failed to parse body: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        Err(self.classify_error(status.as_u16(), &body))
    }

    /// Map a protocol error response onto the client error taxonomy. A 401
    /// drops the held token: the session is gone and the caller has to
    /// reconnect.
    fn classify_error(&self, status: u16, body: &str) -> ClientError {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .map(|parsed| parsed.error)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.to_string()
                }
            });

        match status {
            401 => {
                *self.token.lock() = None;
                ClientError::NotConnected
            }
            403 => ClientError::Forbidden(message),
            423 => ClientError::Locked,
            _ => ClientError::Api { status, message },
        }
    }
}

/// Builder for [`WalletClient`].
///
/// `base_url`, `app_name`, `app_url`, and at least one permission are
/// required; everything else has defaults.
pub struct WalletClientBuilder {
    base_url: Option<String>,
    app_name: Option<String>,
    app_url: Option<String>,
    permissions: Vec<String>,
    description: Option<String>,
    poll_interval: Duration,
    poll_attempts: u32,
    timeout: Duration,
}

impl WalletClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            app_name: None,
            app_url: None,
            permissions: Vec::new(),
            description: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Base URL of the wallet server, e.g. `http://127.0.0.1:8545`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Human-readable app name shown to the user on approval.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Origin URL of the app, shown to the user on approval.
    pub fn app_url(mut self, app_url: impl Into<String>) -> Self {
        self.app_url = Some(app_url.into());
        self
    }

    /// Permission to request, e.g. `"balance"`. May be called repeatedly.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Replace the whole requested permission list.
    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Free-form text shown alongside the approval prompt.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Pause between approval polls (default 2s).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Number of approval polls before `connect` gives up (default 150).
    pub fn poll_attempts(mut self, attempts: u32) -> Self {
        self.poll_attempts = attempts;
        self
    }

    /// Per-request timeout (default 30s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<WalletClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let app_name = self
            .app_name
            .ok_or_else(|| ClientError::Configuration("app_name is required".into()))?;
        let app_url = self
            .app_url
            .ok_or_else(|| ClientError::Configuration("app_url is required".into()))?;
        if self.permissions.is_empty() {
            return Err(ClientError::Configuration(
                "at least one permission is required".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(WalletClient {
            http,
            base_url,
            app_name,
            app_url,
            permissions: self.permissions,
            description: self.description,
            poll_interval: self.poll_interval,
            poll_attempts: self.poll_attempts,
            token: Mutex::new(None),
        })
    }
}


#[cfg(test)]
mod wiremock_tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn status_json(locked: bool) -> serde_json::Value {
        serde_json::json!({
            "available": true,
            "locked": locked,
            "wallet_type": "desktop",
            "network": "testnet",
            "chain_id": "test-chain",
            "version": "1.0"
        })
    }

    fn wallet_info_json() -> serde_json::Value {
        serde_json::json!({
            "address": "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6",
            "truncated_address": "a1b2c3d4...c5d6",
            "locked": false,
            "chain_id": "test-chain",
            "network": "testnet",
            "wallet_type": "desktop",
            "version": "1.0"
        })
    }

    fn auth_status_json(status: &str, token: Option<&str>) -> serde_json::Value {
        let mut body = serde_json::json!({
            "request_id": "req-1",
            "status": status,
            "permissions": ["balance"],
        });
        if let Some(token) = token {
            body["session_token"] = serde_json::json!(token);
        }
        body
    }

    async fn mount_handshake(server: &MockServer, outcome: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/v1/wallet/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_json(false)))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/request"))
            .and(body_partial_json(serde_json::json!({"app_name": "Test App"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "request_id": "req-1",
                "status": "pending"
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/auth/status/req-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(outcome))
            .mount(server)
            .await;
    }

    fn test_client(server: &MockServer) -> WalletClient {
        WalletClient::builder()
            .base_url(server.uri())
            .app_name("Test App")
            .app_url("https://test.example")
            .permission("balance")
            .poll_interval(Duration::from_millis(5))
            .poll_attempts(3)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_approved() {
        let server = MockServer::start().await;
        mount_handshake(&server, auth_status_json("approved", Some("session-token"))).await;

        Mock::given(method("GET"))
            .and(path("/api/v1/wallet/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(wallet_info_json()))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let info = client.connect().await.unwrap();

        assert_eq!(info.truncated_address, "a1b2c3d4...c5d6");
        assert!(client.is_connected());
        assert_eq!(client.session_token().as_deref(), Some("session-token"));
    }

    #[tokio::test]
    async fn test_connect_denied() {
        let server = MockServer::start().await;
        mount_handshake(&server, auth_status_json("denied", None)).await;

        let client = test_client(&server);
        let result = client.connect().await;

        assert!(matches!(result, Err(ClientError::Denied)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_connect_locked_wallet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/wallet/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_json(true)))
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(matches!(client.connect().await, Err(ClientError::Locked)));
    }

    #[tokio::test]
    async fn test_connect_times_out_on_pending() {
        let server = MockServer::start().await;
        mount_handshake(&server, auth_status_json("pending", None)).await;

        let client = test_client(&server);
        assert!(matches!(client.connect().await, Err(ClientError::Timeout)));
    }

    #[tokio::test]
    async fn test_connect_expired_request() {
        let server = MockServer::start().await;
        mount_handshake(&server, auth_status_json("expired", None)).await;

        let client = test_client(&server);
        assert!(matches!(client.connect().await, Err(ClientError::Timeout)));
    }

    #[tokio::test]
    async fn test_connect_unreachable_wallet() {
        // Nothing is listening on this port.
        let client = WalletClient::builder()
            .base_url("http://127.0.0.1:1")
            .app_name("Test App")
            .app_url("https://test.example")
            .permission("balance")
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        assert!(matches!(client.connect().await, Err(ClientError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_balance_with_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/balance/currency"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "balance": 42.5,
                "contract": "currency"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        *client.token.lock() = Some("tok".to_string());

        let balance = client.balance("currency").await.unwrap();
        assert_eq!(balance.balance, 42.5);
        assert_eq!(balance.contract, "currency");
    }

    #[tokio::test]
    async fn test_expired_session_clears_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/wallet/info"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "session expired",
                "code": "UNAUTHORIZED"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        *client.token.lock() = Some("stale".to_string());

        let result = client.wallet_info().await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_forbidden_keeps_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/transaction"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": "missing permission: transactions",
                "code": "FORBIDDEN"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        *client.token.lock() = Some("tok".to_string());

        let request = TransactionRequest {
            contract: "currency".into(),
            function: "transfer".into(),
            kwargs: serde_json::json!({"to": "someone", "amount": 1}),
            stamps_supplied: None,
        };
        let result = client.send_transaction(&request).await;
        assert!(matches!(result, Err(ClientError::Forbidden(_))));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let server = MockServer::start().await;
        let client = test_client(&server);

        assert!(matches!(client.wallet_info().await, Err(ClientError::NotConnected)));
        assert!(matches!(client.balance("currency").await, Err(ClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_revokes_and_forgets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/revoke"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "revoked"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        *client.token.lock() = Some("tok".to_string());

        client.disconnect().await.unwrap();
        assert!(!client.is_connected());

        // Second disconnect is a no-op; the mock expects exactly one call.
        client.disconnect().await.unwrap();
    }
}
