//! Session issuance, validation, eviction, and the wallet lock lifecycle.
//!
//! Sessions are token-bound grants of scoped, time-limited access. The
//! table is capped; when an insert would exceed the cap the earliest-issued
//! session is evicted (FIFO by issue time, not LRU). Locking the wallet,
//! explicitly or through the idle timer, revokes every session at once.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backend::WalletBackend;
use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use crate::events::{EventBroadcaster, WalletEvent};
use crate::permission::{PermissionSet, WalletLockState};

/// A live grant of scoped access, addressed by its opaque token.
///
/// `expires_at` is fixed at issue time; `last_activity` feeds the idle
/// auto-lock accounting only and never extends the expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub app_name: String,
    pub app_url: String,
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

struct SessionTable {
    sessions: HashMap<String, Session>,
    /// Tokens in issue order; drives FIFO eviction. May contain tokens
    /// already revoked, which are skipped during eviction.
    issue_order: VecDeque<String>,
    /// Most recent activity across all sessions (monotonic).
    last_activity: Instant,
}

/// Owns the session table and the wallet lock/auto-lock state.
pub struct SessionManager {
    table: Mutex<SessionTable>,
    lock_state: Arc<WalletLockState>,
    events: Arc<EventBroadcaster>,
    session_duration: Duration,
    max_sessions: usize,
    auto_lock_after: Duration,
}

impl SessionManager {
    pub fn new(
        config: &ProtocolConfig,
        lock_state: Arc<WalletLockState>,
        events: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            table: Mutex::new(SessionTable {
                sessions: HashMap::new(),
                issue_order: VecDeque::new(),
                last_activity: Instant::now(),
            }),
            lock_state,
            events,
            session_duration: config.session_duration,
            max_sessions: config.max_sessions,
            auto_lock_after: config.auto_lock_after,
        }
    }

    /// The duration newly issued sessions live for.
    pub fn session_duration(&self) -> Duration {
        self.session_duration
    }

    /// Issue a session for an approved request.
    ///
    /// Evicts the earliest-issued session first if the table is at
    /// capacity, so an insert never exceeds the cap by more than the exact
    /// number needed.
    pub fn issue(
        &self,
        app_name: &str,
        app_url: &str,
        permissions: PermissionSet,
        duration: Duration,
    ) -> Session {
        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(duration)
                .unwrap_or_else(|_| chrono::Duration::try_hours(1).unwrap_or_default());
        let session = Session {
            token: generate_token(),
            app_name: app_name.to_string(),
            app_url: app_url.to_string(),
            permissions,
            created_at: now,
            expires_at,
            last_activity: now,
        };

        let mut table = self.table.lock();
        while table.sessions.len() >= self.max_sessions {
            // A degenerate cap can leave nothing to evict; admit anyway.
            if !evict_oldest(&mut table) {
                break;
            }
        }
        table.issue_order.push_back(session.token.clone());
        table.sessions.insert(session.token.clone(), session.clone());
        table.last_activity = Instant::now();
        log::info!(
            "session issued for {} ({} permissions), expires {}",
            session.app_name,
            session.permissions.len(),
            session.expires_at
        );
        session
    }

    /// Look up and touch a session.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Unauthorized`] for tokens that were never
    /// issued and for expired ones; expired sessions are removed on sight.
    pub fn validate(&self, token: &str) -> Result<Session> {
        let mut table = self.table.lock();
        let session = table
            .sessions
            .get_mut(token)
            .ok_or_else(|| ProtocolError::Unauthorized("unknown session token".to_string()))?;

        if Utc::now() > session.expires_at {
            table.sessions.remove(token);
            return Err(ProtocolError::Unauthorized("session expired".to_string()));
        }

        session.last_activity = Utc::now();
        let session = session.clone();
        table.last_activity = Instant::now();
        Ok(session)
    }

    /// Remove a single session. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        let removed = self.table.lock().sessions.remove(token).is_some();
        if removed {
            log::info!("session revoked");
        }
        removed
    }

    /// Remove every session.
    pub fn revoke_all(&self) {
        let mut table = self.table.lock();
        let count = table.sessions.len();
        table.sessions.clear();
        table.issue_order.clear();
        if count > 0 {
            log::info!("revoked {} session(s)", count);
        }
    }

    /// Lock the wallet and revoke all sessions.
    ///
    /// Publishes `wallet_locked` only on an actual transition.
    pub fn lock(&self) {
        let was_locked = self.lock_state.swap(true);
        self.revoke_all();
        if !was_locked {
            log::info!("wallet locked");
            self.events.publish(WalletEvent::WalletLocked);
        }
    }

    /// Unlock the wallet after verifying the password with the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Unauthorized`] for a wrong password; backend
    /// failures propagate as [`ProtocolError::Backend`].
    pub async fn unlock(&self, password: &str, backend: &dyn WalletBackend) -> Result<()> {
        if !backend.verify_password(password).await? {
            return Err(ProtocolError::Unauthorized("invalid password".to_string()));
        }
        let was_locked = self.lock_state.swap(false);
        self.table.lock().last_activity = Instant::now();
        if was_locked {
            log::info!("wallet unlocked");
            self.events.publish(WalletEvent::WalletUnlocked);
        }
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.lock_state.is_locked()
    }

    /// When the idle timer would fire given current activity.
    pub fn idle_deadline(&self) -> Instant {
        self.table.lock().last_activity + self.auto_lock_after
    }

    /// Lock the wallet if the idle window has elapsed. Returns whether a
    /// lock happened. Driven by the context's auto-lock task.
    pub fn lock_if_idle(&self) -> bool {
        if self.lock_state.is_locked() {
            return false;
        }
        let idle = self.table.lock().last_activity.elapsed() >= self.auto_lock_after;
        if idle {
            log::info!("auto-lock: no activity for {:?}", self.auto_lock_after);
            self.lock();
        }
        idle
    }

    pub fn session_count(&self) -> usize {
        self.table.lock().sessions.len()
    }
}

/// Generate a cryptographically unpredictable 256-bit token.
fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Returns whether a session was actually removed.
fn evict_oldest(table: &mut SessionTable) -> bool {
    while let Some(token) = table.issue_order.pop_front() {
        if let Some(evicted) = table.sessions.remove(&token) {
            log::info!("session for {} evicted at capacity", evicted.app_name);
            return true;
        }
        // Token was already revoked; keep scanning.
    }
    false
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
