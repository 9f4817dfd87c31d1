//! Error types for the walletgate server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use walletgate_core::ProtocolError;

/// Errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Error from the protocol core.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Malformed request from the client.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServerError::Protocol(e) => {
                let status = match e {
                    ProtocolError::InvalidPermission(_) | ProtocolError::InvalidState(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ProtocolError::NotFound(_) => StatusCode::NOT_FOUND,
                    ProtocolError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    ProtocolError::Forbidden(_) => StatusCode::FORBIDDEN,
                    ProtocolError::Locked => StatusCode::LOCKED,
                    ProtocolError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.code(), e.to_string())
            }
            ServerError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", message.clone())
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Result type alias for server handlers.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
