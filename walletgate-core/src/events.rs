//! State-change events and the fan-out broadcaster behind the push channel.
//!
//! Delivery is best-effort and non-persistent: a listener only sees events
//! published while it is subscribed, in publish order. There is no replay.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::permission::PermissionSet;
use crate::types::AuthStatus;

/// A protocol state-change notification.
///
/// Serialized with a `type` tag matching the wire event names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEvent {
    /// A new authorization request is awaiting the user's decision.
    AuthorizationRequest {
        request_id: String,
        app_name: String,
        app_url: String,
        permissions: PermissionSet,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// A pending request was approved or denied.
    AuthorizationResolved {
        request_id: String,
        status: AuthStatus,
        /// Present only on approval.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_token: Option<String>,
    },

    /// A transaction was accepted by the wallet backend.
    TransactionSubmitted {
        contract: String,
        function: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transaction_hash: Option<String>,
    },

    /// The wallet locked (explicitly or by the idle timer); all sessions
    /// were revoked.
    WalletLocked,

    /// The wallet was unlocked.
    WalletUnlocked,
}

/// Heartbeat reply sent on the push channel for a client `ping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pong {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

impl Pong {
    pub fn now() -> Self {
        Self {
            kind: "pong".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Identifies a registered listener for [`EventBroadcaster::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Receiving half of a subscription.
///
/// Events arrive in publish order. Dropping the listener without
/// unsubscribing is harmless; the broadcaster prunes closed channels on the
/// next publish.
pub struct EventListener {
    id: ListenerId,
    rx: mpsc::UnboundedReceiver<WalletEvent>,
}

impl EventListener {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Wait for the next event. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<WalletEvent> {
        self.rx.recv().await
    }

    /// Non-blocking poll, mainly for tests.
    pub fn try_recv(&mut self) -> Option<WalletEvent> {
        self.rx.try_recv().ok()
    }
}

/// Fan-out publish/subscribe channel for [`WalletEvent`]s.
#[derive(Default)]
pub struct EventBroadcaster {
    listeners: Mutex<HashMap<ListenerId, mpsc::UnboundedSender<WalletEvent>>>,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener.
    pub fn subscribe(&self) -> EventListener {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().insert(id, tx);
        log::debug!("event listener {:?} subscribed", id);
        EventListener { id, rx }
    }

    /// Remove a listener. Safe to call while a publish is in flight and
    /// idempotent for already-removed ids.
    pub fn unsubscribe(&self, id: ListenerId) {
        if self.listeners.lock().remove(&id).is_some() {
            log::debug!("event listener {:?} unsubscribed", id);
        }
    }

    /// Deliver `event` to every currently-subscribed listener.
    pub fn publish(&self, event: WalletEvent) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|id, tx| {
            if tx.send(event.clone()).is_err() {
                log::debug!("event listener {:?} dropped, pruning", id);
                false
            } else {
                true
            }
        });
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
