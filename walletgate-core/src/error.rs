//! Protocol error taxonomy.
//!
//! Every fallible operation in the protocol core returns one of these
//! variants. The server maps each kind to a fixed HTTP status code and the
//! client preserves the kind when surfacing failures to callers.

use thiserror::Error;

/// Errors produced by the protocol core.
///
/// - [`ProtocolError::InvalidPermission`] - unknown or empty permission scope
/// - [`ProtocolError::NotFound`] - unknown request or session id
/// - [`ProtocolError::InvalidState`] - resolving an already-resolved request
/// - [`ProtocolError::Unauthorized`] - missing, expired, or invalid token
/// - [`ProtocolError::Forbidden`] - granted scope does not cover the operation
/// - [`ProtocolError::Locked`] - wallet is locked
/// - [`ProtocolError::Backend`] - the wallet backend capability call failed
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// Unknown permission value, or an empty permission set.
    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    /// Unknown authorization request or session id.
    #[error("not found: {0}")]
    NotFound(String),

    /// A state transition was attempted on an already-resolved request.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Missing, expired, or invalid session token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The session's granted permissions do not cover the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The wallet is locked.
    #[error("wallet is locked")]
    Locked,

    /// A capability call to the wallet backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}

impl ProtocolError {
    /// Returns true if this is an authorization failure (bad token).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Returns true if the wallet was locked.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Returns true if this is a permission-scope failure.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Stable machine-readable code for the wire error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPermission(_) => "INVALID_PERMISSION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Locked => "WALLET_LOCKED",
            Self::Backend(_) => "BACKEND_ERROR",
        }
    }
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
