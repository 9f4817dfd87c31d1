//! Application state for the walletgate server.

use std::sync::Arc;

use walletgate_core::ProtocolContext;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The protocol context owning sessions, requests, cache, and events.
    pub ctx: Arc<ProtocolContext>,
}

impl AppState {
    pub fn new(ctx: Arc<ProtocolContext>) -> Self {
        Self { ctx }
    }
}
