//! The `/ws/v1` push channel.
//!
//! Each connection gets its own subscription on the event broadcaster and
//! receives events in publish order. Clients keep the connection alive with
//! a JSON ping/pong pair; a connection that stays silent past the heartbeat
//! timeout is unsubscribed and closed.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use walletgate_core::Pong;

use crate::state::AppState;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: AppState) {
    let mut listener = state.ctx.events.subscribe();
    let listener_id = listener.id();
    let heartbeat = state.ctx.config.heartbeat_timeout;
    let (mut sink, mut stream) = socket.split();
    let mut deadline = tokio::time::Instant::now() + heartbeat;

    loop {
        tokio::select! {
            event = listener.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sink.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("failed to serialize push event: {}", e),
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        deadline = tokio::time::Instant::now() + heartbeat;
                        if is_ping(&text) {
                            let Ok(pong) = serde_json::to_string(&Pong::now()) else {
                                continue;
                            };
                            if sink.send(Message::Text(pong)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        deadline = tokio::time::Instant::now() + heartbeat;
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Pong(_) | Message::Binary(_))) => {
                        deadline = tokio::time::Instant::now() + heartbeat;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                log::debug!("push listener {:?} missed its heartbeat, dropping", listener_id);
                break;
            }
        }
    }

    state.ctx.events.unsubscribe(listener_id);
}

fn is_ping(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(|t| t == "ping"))
        .unwrap_or(false)
}
