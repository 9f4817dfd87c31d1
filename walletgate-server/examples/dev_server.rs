//! Wallet server example backed by the in-memory dev wallet.
//!
//! Run with:
//! ```sh
//! cargo run -p walletgate-server --example dev_server
//! ```
//!
//! Drive the handshake with curl:
//! ```sh
//! curl http://127.0.0.1:8545/api/v1/wallet/status
//! curl -X POST http://127.0.0.1:8545/api/v1/auth/request \
//!   -H "Content-Type: application/json" \
//!   -d '{"app_name": "Curl", "app_url": "https://example.org", "permissions": ["wallet_info", "balance"]}'
//! # then approve it:
//! curl http://127.0.0.1:8545/api/v1/auth/approve/<request_id>
//! ```

use std::sync::Arc;

use walletgate_core::{DevWallet, ProtocolConfig, ProtocolContext, WalletType};
use walletgate_server::WalletRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ProtocolConfig::default();
    let bind_addr = config.bind_addr();

    let ctx = ProtocolContext::new(
        config,
        WalletType::Desktop,
        Arc::new(DevWallet::new("hunter2")),
    );
    let app = WalletRouter::new(ctx.clone()).build();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Wallet server running at http://{}", bind_addr);
    println!("Status:  GET  http://{}/api/v1/wallet/status", bind_addr);
    println!("Connect: POST http://{}/api/v1/auth/request", bind_addr);
    println!("Events:  WS   ws://{}/ws/v1", bind_addr);

    axum::serve(listener, app).await?;
    ctx.shutdown();

    Ok(())
}
