//! Permission model and enforcement gate.
//!
//! Permissions form a closed set: a request naming anything outside it is
//! rejected up front, and every permissioned handler checks the session's
//! granted set before doing any work.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// A single capability a session may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read wallet address and metadata.
    WalletInfo,
    /// Read token balances.
    Balance,
    /// Submit transactions.
    Transactions,
    /// Sign arbitrary messages.
    SignMessage,
    /// Register new tokens with the wallet.
    AddToken,
}

impl Permission {
    /// Parse a wire-format permission string.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "wallet_info" => Ok(Self::WalletInfo),
            "balance" => Ok(Self::Balance),
            "transactions" => Ok(Self::Transactions),
            "sign_message" => Ok(Self::SignMessage),
            "add_token" => Ok(Self::AddToken),
            other => Err(ProtocolError::InvalidPermission(other.to_string())),
        }
    }

    /// Wire-format name of this permission.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WalletInfo => "wallet_info",
            Self::Balance => "balance",
            Self::Transactions => "transactions",
            Self::SignMessage => "sign_message",
            Self::AddToken => "add_token",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, deduplicated set of permissions.
///
/// Duplicates in the wire payload are collapsed rather than rejected; an
/// empty set is never valid for an authorization request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a non-empty list of wire-format permission strings.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPermission`] if the list is empty or
    /// contains an unknown value.
    pub fn from_strs<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        if values.is_empty() {
            return Err(ProtocolError::InvalidPermission(
                "permission set must not be empty".to_string(),
            ));
        }
        let mut set = BTreeSet::new();
        for value in values {
            set.insert(Permission::parse(value.as_ref())?);
        }
        Ok(Self(set))
    }

    /// Check whether the set contains a permission.
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Check whether every permission in this set appears in `other`.
    pub fn is_subset_of(&self, other: &PermissionSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate permissions in their canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Shared wallet lock flag.
///
/// Owned by the [`crate::context::ProtocolContext`] and shared between the
/// session manager (which mutates it) and the [`PermissionEnforcer`]
/// (which only reads it).
#[derive(Debug)]
pub struct WalletLockState {
    locked: AtomicBool,
}

impl WalletLockState {
    pub fn new(locked: bool) -> Self {
        Self {
            locked: AtomicBool::new(locked),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::Release);
    }

    /// Set the flag and return its previous value.
    pub fn swap(&self, locked: bool) -> bool {
        self.locked.swap(locked, Ordering::AcqRel)
    }
}

/// Gate that every permissioned handler passes through.
///
/// Called after session validation has already produced a live session;
/// checks the wallet lock first, then the granted scope. Status and unlock
/// operations bypass this gate entirely.
#[derive(Clone)]
pub struct PermissionEnforcer {
    lock_state: Arc<WalletLockState>,
}

impl PermissionEnforcer {
    pub fn new(lock_state: Arc<WalletLockState>) -> Self {
        Self { lock_state }
    }

    /// Verify that `granted` covers `required` and the wallet is unlocked.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Locked`] while the wallet is locked, or
    /// [`ProtocolError::Forbidden`] if the permission was not granted.
    pub fn check(&self, granted: &PermissionSet, required: Permission) -> Result<()> {
        if self.lock_state.is_locked() {
            return Err(ProtocolError::Locked);
        }
        if !granted.contains(required) {
            return Err(ProtocolError::Forbidden(format!(
                "session does not hold the '{}' permission",
                required
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "permission_tests.rs"]
mod tests;
