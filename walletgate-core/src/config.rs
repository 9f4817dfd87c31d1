//! Protocol configuration.

use std::time::Duration;

/// Default port the wallet server listens on.
pub const DEFAULT_PORT: u16 = 8545;

/// Default host the wallet server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Protocol version reported by the status endpoint.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Tunables for the protocol core.
///
/// Callers construct this in code; there is no config-file layer. The
/// defaults match the reference deployment: one-hour sessions capped at 100,
/// five-minute authorization requests, 30-minute auto-lock, 30-second read
/// cache.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Host the server binds to.
    pub host: String,
    /// Port the server binds to.
    pub port: u16,
    /// Network the wallet is attached to (reported, not interpreted).
    pub network: String,
    /// Chain id the wallet is attached to (reported, not interpreted).
    pub chain_id: String,
    /// How long an issued session stays valid. Fixed, not sliding.
    pub session_duration: Duration,
    /// Maximum concurrent sessions; the oldest-issued session is evicted
    /// when an insert would exceed this.
    pub max_sessions: usize,
    /// Idle time across all sessions before the wallet locks itself.
    pub auto_lock_after: Duration,
    /// How long a pending authorization request stays answerable.
    pub request_ttl: Duration,
    /// Grace period before resolved or expired requests are purged.
    pub request_gc_grace: Duration,
    /// Staleness bound for cached read responses.
    pub cache_ttl: Duration,
    /// Upper bound a cache follower waits on another caller's computation.
    pub cache_wait_timeout: Duration,
    /// Interval between maintenance sweeps (request GC, expiry).
    pub sweep_interval: Duration,
    /// Push-channel listeners are dropped after this long without traffic.
    pub heartbeat_timeout: Duration,
    /// Whether the wallet starts in the locked state.
    pub start_locked: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            network: "https://testnet.example.org".to_string(),
            chain_id: "test-chain-1".to_string(),
            session_duration: Duration::from_secs(60 * 60),
            max_sessions: 100,
            auto_lock_after: Duration::from_secs(30 * 60),
            request_ttl: Duration::from_secs(5 * 60),
            request_gc_grace: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(30),
            cache_wait_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(60),
            start_locked: false,
        }
    }
}

impl ProtocolConfig {
    /// Address string suitable for a TCP bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
