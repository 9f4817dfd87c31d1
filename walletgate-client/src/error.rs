//! Error types for the walletgate client.

use serde::Deserialize;
use thiserror::Error;

/// Body shape of a protocol error response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub code: Option<String>,
}

/// Errors that can occur when talking to a wallet server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The wallet server could not be reached at all.
    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    /// The wallet is locked. The user has to unlock it on the wallet side.
    #[error("wallet is locked")]
    Locked,

    /// The user denied the authorization request.
    #[error("authorization denied by the user")]
    Denied,

    /// The authorization request was not approved before polling gave up,
    /// or it expired on the server.
    #[error("timed out waiting for authorization approval")]
    Timeout,

    /// No valid session token. Call `connect` (again) first.
    #[error("not connected: no valid session token")]
    NotConnected,

    /// The session exists but lacks the permission the operation needs.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// Any other protocol-level failure.
    #[error("wallet API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A reply that does not match the wire contract.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client-side setup problem (bad builder input, dead worker thread).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure on an established connection.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// True when reconnecting (a fresh `connect`) could help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Unavailable(_)
                | ClientError::Timeout
                | ClientError::NotConnected
                | ClientError::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ClientError::Forbidden("missing balance".into());
        assert!(err.to_string().contains("permission denied"));
        let err = ClientError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ClientError::Unavailable("refused".into()).is_retryable());
        assert!(ClientError::NotConnected.is_retryable());
        assert!(ClientError::Timeout.is_retryable());
        assert!(!ClientError::Denied.is_retryable());
        assert!(!ClientError::Locked.is_retryable());
        assert!(!ClientError::Forbidden("nope".into()).is_retryable());
    }

    #[test]
    fn test_api_error_body_parses_without_code() {
        let body: ApiErrorBody = serde_json::from_str(r#"{"error": "nope"}"#).unwrap();
        assert_eq!(body.error, "nope");
        assert!(body.code.is_none());
    }
}
