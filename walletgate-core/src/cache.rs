//! Single-flight, TTL-bound response cache.
//!
//! Read handlers memoize backend calls here. When several callers miss on
//! the same key at once, exactly one runs the computation; the rest wait on
//! it and receive the same outcome, success or failure. Failures are shared
//! with the waiters of that flight but never cached. A flight whose leader
//! is cancelled before completing is cleared so the key recovers.
//!
//! Entries expire by age only. Callers are expected to use a bounded key
//! space (one entry per operation + argument combination), so there is no
//! size-based eviction.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{ProtocolError, Result};

type FlightOutcome<V> = Option<Result<V>>;

enum Slot<V> {
    Ready {
        value: V,
        inserted_at: Instant,
        ttl: Duration,
    },
    Pending {
        flight: u64,
        rx: watch::Receiver<FlightOutcome<V>>,
    },
}

enum Role<V> {
    Hit(V),
    Follower {
        flight: u64,
        rx: watch::Receiver<FlightOutcome<V>>,
    },
    Leader {
        flight: u64,
        tx: watch::Sender<FlightOutcome<V>>,
    },
}

/// Generic single-flight memoizer keyed by operation + argument fingerprint.
pub struct ResponseCache<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
    next_flight: AtomicU64,
    wait_timeout: Duration,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache whose followers wait at most `wait_timeout` for an
    /// in-flight computation before giving up.
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_flight: AtomicU64::new(0),
            wait_timeout,
        }
    }

    /// Return the cached value for `key` if fresh, otherwise compute it.
    ///
    /// The computation is awaited by at most one caller per flight; every
    /// concurrent caller for the same key receives that flight's outcome.
    pub async fn get_or_compute<F>(&self, key: &str, ttl: Duration, compute: F) -> Result<V>
    where
        F: Future<Output = Result<V>>,
    {
        let role = {
            let mut slots = self.slots.lock();
            match slots.get(key) {
                Some(Slot::Ready {
                    value,
                    inserted_at,
                    ttl,
                }) if inserted_at.elapsed() < *ttl => Role::Hit(value.clone()),
                // A pending slot whose sender is gone belongs to a leader
                // that was cancelled mid-compute; retake it instead of
                // following a flight that can never land.
                Some(Slot::Pending { flight, rx }) if rx.has_changed().is_ok() => Role::Follower {
                    flight: *flight,
                    rx: rx.clone(),
                },
                _ => {
                    let flight = self.next_flight.fetch_add(1, Ordering::Relaxed);
                    let (tx, rx) = watch::channel(None);
                    slots.insert(key.to_string(), Slot::Pending { flight, rx });
                    Role::Leader { flight, tx }
                }
            }
        };

        match role {
            Role::Hit(value) => Ok(value),
            Role::Follower { flight, rx } => self.await_flight(key, flight, rx).await,
            Role::Leader { flight, tx } => {
                let result = compute.await;
                {
                    let mut slots = self.slots.lock();
                    // Only install the outcome if this flight still owns the
                    // slot; an invalidate() during the computation wins.
                    let still_owner = matches!(
                        slots.get(key),
                        Some(Slot::Pending { flight: f, .. }) if *f == flight
                    );
                    if still_owner {
                        match &result {
                            Ok(value) => {
                                slots.insert(
                                    key.to_string(),
                                    Slot::Ready {
                                        value: value.clone(),
                                        inserted_at: Instant::now(),
                                        ttl,
                                    },
                                );
                            }
                            Err(_) => {
                                slots.remove(key);
                            }
                        }
                    }
                }
                let _ = tx.send(Some(result.clone()));
                result
            }
        }
    }

    /// Drop the entry for `key`, if any.
    ///
    /// Mutating operations call this so stale reads are not served after a
    /// state-changing call. An in-flight computation for the key is
    /// discarded rather than installed when it completes.
    pub fn invalidate(&self, key: &str) {
        if self.slots.lock().remove(key).is_some() {
            log::debug!("cache entry invalidated: {}", key);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Number of entries, fresh or not. Mainly for tests.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    async fn await_flight(
        &self,
        key: &str,
        flight: u64,
        mut rx: watch::Receiver<FlightOutcome<V>>,
    ) -> Result<V> {
        let outcome = tokio::time::timeout(self.wait_timeout, async {
            loop {
                if let Some(result) = rx.borrow_and_update().clone() {
                    return Some(result);
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        })
        .await;

        match outcome {
            Ok(Some(result)) => result,
            Ok(None) => {
                // The leader was cancelled before producing an outcome.
                // Clear the dead slot so the next caller recomputes.
                self.remove_flight(key, flight);
                Err(ProtocolError::Backend(
                    "in-flight computation was abandoned".to_string(),
                ))
            }
            Err(_) => {
                self.remove_flight(key, flight);
                Err(ProtocolError::Backend(
                    "timed out waiting for in-flight computation".to_string(),
                ))
            }
        }
    }

    /// Remove the pending slot for `key` if `flight` still owns it.
    fn remove_flight(&self, key: &str, flight: u64) {
        let mut slots = self.slots.lock();
        let stale = matches!(
            slots.get(key),
            Some(Slot::Pending { flight: f, .. }) if *f == flight
        );
        if stale {
            slots.remove(key);
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
