//! HTTP handlers for the wallet protocol endpoints.
//!
//! Every permissioned handler runs the same gauntlet: bearer token ->
//! session validation -> permission enforcement -> work. Status, the auth
//! handshake, and unlock are deliberately outside that gate.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use walletgate_core::{
    AddTokenRequest, AuthRequestPayload, AuthStatus, AuthStatusResponse, AuthorizationResponse,
    ApprovePayload, BalanceResponse, Permission, PermissionSet, ProtocolError, Session,
    SignMessageRequest, SignatureResponse, StatusResponse, TransactionRequest, TransactionResult,
    UnlockRequest, WalletEvent, WalletInfo, PROTOCOL_VERSION,
};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> ServerResult<&str> {
    let unauthorized =
        || ServerError::Protocol(ProtocolError::Unauthorized("missing bearer token".into()));
    let value = headers
        .get(http::header::AUTHORIZATION)
        .ok_or_else(unauthorized)?
        .to_str()
        .map_err(|_| unauthorized())?;
    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(unauthorized)
}

/// Validate the caller's session and check the required permission.
fn authorize(state: &AppState, headers: &HeaderMap, required: Permission) -> ServerResult<Session> {
    let token = bearer_token(headers)?;
    let session = state.ctx.sessions.validate(token)?;
    state.ctx.enforcer.check(&session.permissions, required)?;
    Ok(session)
}

/// `GET /api/v1/wallet/status` - unauthenticated liveness and lock state.
pub async fn wallet_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let ctx = &state.ctx;
    Json(StatusResponse {
        available: true,
        locked: ctx.sessions.is_locked(),
        wallet_type: ctx.wallet_type,
        network: ctx.config.network.clone(),
        chain_id: ctx.config.chain_id.clone(),
        version: PROTOCOL_VERSION.to_string(),
    })
}

/// `POST /api/v1/auth/request` - an app asks for scoped access.
pub async fn auth_request(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequestPayload>,
) -> ServerResult<Json<Value>> {
    if payload.app_name.trim().is_empty() {
        return Err(ServerError::InvalidRequest("app_name must not be empty".into()));
    }
    if payload.app_url.trim().is_empty() {
        return Err(ServerError::InvalidRequest("app_url must not be empty".into()));
    }

    let permissions = PermissionSet::from_strs(&payload.permissions).map_err(ServerError::Protocol)?;
    let request_id = state.ctx.registry.create_request(
        &payload.app_name,
        &payload.app_url,
        permissions,
        payload.description,
    )?;

    Ok(Json(json!({
        "request_id": request_id,
        "status": AuthStatus::Pending,
    })))
}

/// `GET|POST /api/v1/auth/approve/{request_id}` - trusted caller approves.
///
/// A POST body may narrow the granted permissions; GET (and an empty POST)
/// grants everything that was requested.
pub async fn auth_approve(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    body: Option<Json<ApprovePayload>>,
) -> ServerResult<Json<AuthorizationResponse>> {
    let granted = body
        .and_then(|Json(payload)| payload.permissions)
        .map(|values| PermissionSet::from_strs(&values))
        .transpose()?;

    let session = state.ctx.registry.approve(&request_id, granted)?;
    Ok(Json(AuthorizationResponse {
        session_token: session.token,
        expires_at: session.expires_at,
        permissions: session.permissions,
        status: AuthStatus::Approved,
    }))
}

/// `GET|POST /api/v1/auth/deny/{request_id}` - trusted caller denies.
pub async fn auth_deny(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ServerResult<Json<Value>> {
    state.ctx.registry.deny(&request_id)?;
    Ok(Json(json!({
        "status": AuthStatus::Denied,
        "reason": "user rejected the request",
    })))
}

/// `GET /api/v1/auth/status/{request_id}` - poll the request lifecycle.
pub async fn auth_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ServerResult<Json<AuthStatusResponse>> {
    Ok(Json(state.ctx.registry.poll_status(&request_id)?))
}

/// `GET /api/v1/auth/pending` - requests awaiting a decision, oldest first.
pub async fn auth_pending(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "pending_requests": state.ctx.registry.pending_requests(),
    }))
}

/// `POST /api/v1/auth/revoke` - a session disconnects itself.
pub async fn auth_revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Value>> {
    let token = bearer_token(&headers)?;
    let session = state.ctx.sessions.validate(token)?;
    state.ctx.sessions.revoke(&session.token);
    Ok(Json(json!({ "status": "revoked" })))
}

/// `GET /api/v1/wallet/info` - requires `wallet_info`.
pub async fn wallet_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<WalletInfo>> {
    authorize(&state, &headers, Permission::WalletInfo)?;

    let ctx = &state.ctx;
    let address = ctx.backend.address();
    Ok(Json(WalletInfo {
        truncated_address: WalletInfo::truncate_address(&address),
        address,
        locked: ctx.sessions.is_locked(),
        chain_id: ctx.config.chain_id.clone(),
        network: ctx.config.network.clone(),
        wallet_type: ctx.wallet_type,
        version: PROTOCOL_VERSION.to_string(),
    }))
}

fn balance_cache_key(contract: &str) -> String {
    format!("balance:{}", contract)
}

/// `GET /api/v1/balance/{contract}` - requires `balance`; served through
/// the single-flight cache.
pub async fn balance(
    State(state): State<AppState>,
    Path(contract): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Json<BalanceResponse>> {
    authorize(&state, &headers, Permission::Balance)?;

    let ctx = state.ctx.clone();
    let key = balance_cache_key(&contract);
    let response = ctx
        .balance_cache
        .get_or_compute(&key, ctx.config.cache_ttl, {
            let backend = ctx.backend.clone();
            let contract = contract.clone();
            async move {
                let amount = backend.balance(&contract).await?;
                Ok(BalanceResponse {
                    balance: amount,
                    contract,
                    symbol: None,
                })
            }
        })
        .await?;
    Ok(Json(response))
}

/// `POST /api/v1/transaction` - requires `transactions`; a successful
/// submit invalidates the balance cache entry for the affected contract.
pub async fn transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TransactionRequest>,
) -> ServerResult<Json<TransactionResult>> {
    authorize(&state, &headers, Permission::Transactions)?;

    let ctx = &state.ctx;
    let result = ctx.backend.submit_transaction(&payload).await?;
    if result.success {
        ctx.balance_cache.invalidate(&balance_cache_key(&payload.contract));
    }
    ctx.events.publish(WalletEvent::TransactionSubmitted {
        contract: payload.contract.clone(),
        function: payload.function.clone(),
        success: result.success,
        transaction_hash: result.transaction_hash.clone(),
    });
    Ok(Json(result))
}

/// `POST /api/v1/sign` - requires `sign_message`.
pub async fn sign_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SignMessageRequest>,
) -> ServerResult<Json<SignatureResponse>> {
    authorize(&state, &headers, Permission::SignMessage)?;

    let ctx = &state.ctx;
    let signature = ctx.backend.sign(&payload.message).await?;
    Ok(Json(SignatureResponse {
        message: payload.message,
        signature,
        signer: ctx.backend.address(),
    }))
}

/// `POST /api/v1/tokens/add` - requires `add_token`.
pub async fn add_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddTokenRequest>,
) -> ServerResult<Json<Value>> {
    authorize(&state, &headers, Permission::AddToken)?;

    state.ctx.backend.add_token(&payload).await?;
    Ok(Json(json!({
        "status": "added",
        "contract_address": payload.contract_address,
    })))
}

/// `POST /api/v1/wallet/unlock` - verify the password with the backend.
pub async fn wallet_unlock(
    State(state): State<AppState>,
    Json(payload): Json<UnlockRequest>,
) -> ServerResult<Json<Value>> {
    let ctx = &state.ctx;
    ctx.sessions.unlock(&payload.password, ctx.backend.as_ref()).await?;
    Ok(Json(json!({ "status": "unlocked" })))
}

/// `POST /api/v1/wallet/lock` - lock and revoke every session.
pub async fn wallet_lock(State(state): State<AppState>) -> Json<Value> {
    state.ctx.sessions.lock();
    Json(json!({ "status": "locked" }))
}
