//! Process-wide protocol state with an explicit lifecycle.
//!
//! Everything mutable (requests, sessions, lock state, cache) hangs off one
//! [`ProtocolContext`] that is built once, passed to every component, and
//! shut down deterministically. No ambient globals.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::backend::WalletBackend;
use crate::cache::ResponseCache;
use crate::config::ProtocolConfig;
use crate::events::EventBroadcaster;
use crate::permission::{PermissionEnforcer, WalletLockState};
use crate::registry::AuthorizationRegistry;
use crate::session::SessionManager;
use crate::types::{BalanceResponse, WalletType};

/// Owns every shared protocol component plus the background timers.
pub struct ProtocolContext {
    pub config: ProtocolConfig,
    pub wallet_type: WalletType,
    pub backend: Arc<dyn WalletBackend>,
    pub lock_state: Arc<WalletLockState>,
    pub events: Arc<EventBroadcaster>,
    pub sessions: Arc<SessionManager>,
    pub registry: Arc<AuthorizationRegistry>,
    pub enforcer: PermissionEnforcer,
    pub balance_cache: ResponseCache<BalanceResponse>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ProtocolContext {
    /// Wire up all components. Does not spawn anything; call
    /// [`Self::spawn_maintenance`] from within a tokio runtime to start the
    /// auto-lock and request-sweep timers.
    pub fn new(
        config: ProtocolConfig,
        wallet_type: WalletType,
        backend: Arc<dyn WalletBackend>,
    ) -> Arc<Self> {
        let lock_state = Arc::new(WalletLockState::new(config.start_locked));
        let events = Arc::new(EventBroadcaster::new());
        let sessions = Arc::new(SessionManager::new(
            &config,
            lock_state.clone(),
            events.clone(),
        ));
        let registry = Arc::new(AuthorizationRegistry::new(
            &config,
            sessions.clone(),
            events.clone(),
        ));
        let enforcer = PermissionEnforcer::new(lock_state.clone());
        let balance_cache = ResponseCache::new(config.cache_wait_timeout);

        Arc::new(Self {
            config,
            wallet_type,
            backend,
            lock_state,
            events,
            sessions,
            registry,
            enforcer,
            balance_cache,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Start the idle auto-lock timer and the request GC sweep.
    ///
    /// Idempotent; the tasks hold only what they need, never the context
    /// itself, so shutdown cannot deadlock on a reference cycle.
    pub fn spawn_maintenance(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        let sessions = self.sessions.clone();
        let lock_state = self.lock_state.clone();
        let auto_lock_after = self.config.auto_lock_after;
        tasks.push(tokio::spawn(async move {
            loop {
                if lock_state.is_locked() {
                    tokio::time::sleep(auto_lock_after).await;
                    continue;
                }
                let deadline = tokio::time::Instant::from_std(sessions.idle_deadline());
                tokio::time::sleep_until(deadline).await;
                sessions.lock_if_idle();
            }
        }));

        let registry = self.registry.clone();
        let sweep_interval = self.config.sweep_interval;
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                registry.sweep();
            }
        }));
    }

    /// Cancel every background task. Idempotent; required before the
    /// process can shut down without leaking timers.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for ProtocolContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
