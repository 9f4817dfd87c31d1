//! The request -> approve/deny -> session-issuance state machine.
//!
//! Authorization requests are created by untrusted apps and resolved by the
//! user through a trusted channel. Every transition happens under one lock,
//! so concurrent approve/deny/expire attempts on the same id cannot both
//! succeed. Stale requests expire lazily on read and are purged by the
//! maintenance sweep after a grace period.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use crate::events::{EventBroadcaster, WalletEvent};
use crate::permission::PermissionSet;
use crate::session::{Session, SessionManager};
use crate::types::{AuthStatus, AuthStatusResponse};

/// An authorization request awaiting (or past) the user's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub request_id: String,
    pub app_name: String,
    pub app_url: String,
    pub permissions: PermissionSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: AuthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub session_token: Option<String>,
}

/// Runs the request lifecycle and issues sessions on approval.
pub struct AuthorizationRegistry {
    requests: Mutex<HashMap<String, PendingAuthorization>>,
    sessions: Arc<SessionManager>,
    events: Arc<EventBroadcaster>,
    request_ttl: Duration,
    gc_grace: Duration,
}

impl AuthorizationRegistry {
    pub fn new(
        config: &ProtocolConfig,
        sessions: Arc<SessionManager>,
        events: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            sessions,
            events,
            request_ttl: config.request_ttl,
            gc_grace: config.request_gc_grace,
        }
    }

    /// Register a new pending request and announce it to listeners.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPermission`] for an empty set;
    /// unknown permission values were already rejected during parsing.
    pub fn create_request(
        &self,
        app_name: &str,
        app_url: &str,
        permissions: PermissionSet,
        description: Option<String>,
    ) -> Result<String> {
        if permissions.is_empty() {
            return Err(ProtocolError::InvalidPermission(
                "permission set must not be empty".to_string(),
            ));
        }

        let request = PendingAuthorization {
            request_id: Uuid::new_v4().to_string(),
            app_name: app_name.to_string(),
            app_url: app_url.to_string(),
            permissions,
            description,
            created_at: Utc::now(),
            status: AuthStatus::Pending,
            resolved_at: None,
            session_token: None,
        };
        let request_id = request.request_id.clone();
        let event = WalletEvent::AuthorizationRequest {
            request_id: request_id.clone(),
            app_name: request.app_name.clone(),
            app_url: request.app_url.clone(),
            permissions: request.permissions.clone(),
            description: request.description.clone(),
        };
        log::info!(
            "authorization request {} from {} ({})",
            request_id,
            request.app_name,
            request.app_url
        );

        // Insert before announcing so a listener acting on the event can
        // resolve the request right away.
        self.requests.lock().insert(request_id.clone(), request);
        self.events.publish(event);
        Ok(request_id)
    }

    /// Approve a pending request, optionally narrowing the grant, and issue
    /// a session scoped to it.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::NotFound`] for an unknown id
    /// - [`ProtocolError::InvalidState`] if already resolved or expired
    /// - [`ProtocolError::InvalidPermission`] if the grant is empty or not a
    ///   subset of what was requested (narrowing is allowed, widening never)
    pub fn approve(&self, request_id: &str, granted: Option<PermissionSet>) -> Result<Session> {
        let mut requests = self.requests.lock();
        let request = Self::live_request(&mut requests, request_id, self.request_ttl)?;

        let granted = match granted {
            Some(set) if set.is_empty() => {
                return Err(ProtocolError::InvalidPermission(
                    "granted set must not be empty".to_string(),
                ));
            }
            Some(set) => {
                if !set.is_subset_of(&request.permissions) {
                    return Err(ProtocolError::InvalidPermission(
                        "grant may narrow the requested permissions but never widen them"
                            .to_string(),
                    ));
                }
                set
            }
            None => request.permissions.clone(),
        };

        let session = self.sessions.issue(
            &request.app_name,
            &request.app_url,
            granted,
            self.sessions.session_duration(),
        );
        request.status = AuthStatus::Approved;
        request.resolved_at = Some(Utc::now());
        request.session_token = Some(session.token.clone());
        drop(requests);

        log::info!("authorization request {} approved", request_id);
        self.events.publish(WalletEvent::AuthorizationResolved {
            request_id: request_id.to_string(),
            status: AuthStatus::Approved,
            session_token: Some(session.token.clone()),
        });
        Ok(session)
    }

    /// Deny a pending request.
    ///
    /// Same preconditions as [`Self::approve`].
    pub fn deny(&self, request_id: &str) -> Result<()> {
        let mut requests = self.requests.lock();
        let request = Self::live_request(&mut requests, request_id, self.request_ttl)?;

        request.status = AuthStatus::Denied;
        request.resolved_at = Some(Utc::now());
        drop(requests);

        log::info!("authorization request {} denied", request_id);
        self.events.publish(WalletEvent::AuthorizationResolved {
            request_id: request_id.to_string(),
            status: AuthStatus::Denied,
            session_token: None,
        });
        Ok(())
    }

    /// Idempotent status read used by polling clients.
    ///
    /// A pending request past its TTL transitions to expired before the
    /// status is reported, so callers never see a stale `pending`.
    pub fn poll_status(&self, request_id: &str) -> Result<AuthStatusResponse> {
        let mut requests = self.requests.lock();
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| ProtocolError::NotFound(format!("unknown request {}", request_id)))?;
        expire_if_stale(request, self.request_ttl);

        Ok(AuthStatusResponse {
            request_id: request.request_id.clone(),
            status: request.status,
            permissions: request.permissions.clone(),
            session_token: request.session_token.clone(),
        })
    }

    /// Snapshot of requests still awaiting a decision, oldest first.
    pub fn pending_requests(&self) -> Vec<PendingAuthorization> {
        let mut requests = self.requests.lock();
        let mut pending: Vec<_> = requests
            .values_mut()
            .map(|request| {
                expire_if_stale(request, self.request_ttl);
                request
            })
            .filter(|request| request.status == AuthStatus::Pending)
            .map(|request| request.clone())
            .collect();
        pending.sort_by_key(|request| request.created_at);
        pending
    }

    /// Expire stale pending requests and purge resolved or expired ones
    /// whose grace period has elapsed. Advisory cleanup; run periodically.
    pub fn sweep(&self) {
        let now = Utc::now();
        let mut requests = self.requests.lock();
        let before = requests.len();
        requests.retain(|_, request| {
            expire_if_stale(request, self.request_ttl);
            match request.resolved_at {
                Some(resolved_at) => {
                    age_of(resolved_at, now) < self.gc_grace
                }
                None => true,
            }
        });
        let purged = before - requests.len();
        if purged > 0 {
            log::debug!("purged {} settled authorization request(s)", purged);
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn live_request<'a>(
        requests: &'a mut HashMap<String, PendingAuthorization>,
        request_id: &str,
        ttl: Duration,
    ) -> Result<&'a mut PendingAuthorization> {
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| ProtocolError::NotFound(format!("unknown request {}", request_id)))?;
        expire_if_stale(request, ttl);
        if request.status != AuthStatus::Pending {
            return Err(ProtocolError::InvalidState(format!(
                "request already {}",
                request.status
            )));
        }
        Ok(request)
    }
}

fn age_of(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(since).to_std().unwrap_or_default()
}

fn expire_if_stale(request: &mut PendingAuthorization, ttl: Duration) {
    if request.status == AuthStatus::Pending {
        let now = Utc::now();
        if age_of(request.created_at, now) >= ttl {
            request.status = AuthStatus::Expired;
            request.resolved_at = Some(now);
            log::info!("authorization request {} expired", request.request_id);
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
