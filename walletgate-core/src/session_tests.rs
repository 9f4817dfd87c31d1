use super::*;
use crate::backend::DevWallet;
use crate::permission::Permission;

fn perms(names: &[&str]) -> PermissionSet {
    PermissionSet::from_strs(names).unwrap()
}

fn manager_with(max_sessions: usize, auto_lock_after: Duration) -> SessionManager {
    let config = ProtocolConfig {
        max_sessions,
        auto_lock_after,
        ..ProtocolConfig::default()
    };
    SessionManager::new(
        &config,
        Arc::new(WalletLockState::new(false)),
        Arc::new(EventBroadcaster::new()),
    )
}

fn manager() -> SessionManager {
    manager_with(100, Duration::from_secs(1800))
}

const HOUR: Duration = Duration::from_secs(3600);

#[test]
fn test_issue_and_validate() {
    let manager = manager();
    let session = manager.issue("App", "https://app.example", perms(&["balance"]), HOUR);

    assert_eq!(session.token.len(), 64);
    assert!(session.expires_at > session.created_at);

    let validated = manager.validate(&session.token).unwrap();
    assert_eq!(validated.app_name, "App");
    assert!(validated.permissions.contains(Permission::Balance));
    assert!(validated.last_activity >= session.last_activity);
}

#[test]
fn test_tokens_are_unique() {
    let manager = manager();
    let a = manager.issue("A", "https://a", perms(&["balance"]), HOUR);
    let b = manager.issue("B", "https://b", perms(&["balance"]), HOUR);
    assert_ne!(a.token, b.token);
}

#[test]
fn test_validate_unknown_token() {
    let manager = manager();
    let err = manager.validate("never-issued").unwrap_err();
    assert!(err.is_unauthorized());
}

#[test]
fn test_validate_expired_session() {
    let manager = manager();
    let session = manager.issue("App", "https://app", perms(&["balance"]), Duration::ZERO);

    std::thread::sleep(Duration::from_millis(5));
    let err = manager.validate(&session.token).unwrap_err();
    assert!(err.is_unauthorized());
    // Expired sessions are removed on sight.
    assert_eq!(manager.session_count(), 0);
}

#[test]
fn test_revoke() {
    let manager = manager();
    let session = manager.issue("App", "https://app", perms(&["balance"]), HOUR);

    assert!(manager.revoke(&session.token));
    assert!(!manager.revoke(&session.token));
    assert!(manager.validate(&session.token).is_err());
}

#[test]
fn test_capacity_evicts_exactly_the_oldest() {
    let manager = manager_with(2, Duration::from_secs(1800));
    let first = manager.issue("A", "https://a", perms(&["balance"]), HOUR);
    let second = manager.issue("B", "https://b", perms(&["balance"]), HOUR);
    let third = manager.issue("C", "https://c", perms(&["balance"]), HOUR);

    assert_eq!(manager.session_count(), 2);
    assert!(manager.validate(&first.token).is_err());
    assert!(manager.validate(&second.token).is_ok());
    assert!(manager.validate(&third.token).is_ok());
}

#[test]
fn test_zero_cap_keeps_only_the_newest_session() {
    let manager = manager_with(0, Duration::from_secs(1800));
    let first = manager.issue("A", "https://a", perms(&["balance"]), HOUR);
    let second = manager.issue("B", "https://b", perms(&["balance"]), HOUR);

    assert_eq!(manager.session_count(), 1);
    assert!(manager.validate(&first.token).is_err());
    assert!(manager.validate(&second.token).is_ok());
}

#[test]
fn test_eviction_skips_already_revoked_tokens() {
    let manager = manager_with(2, Duration::from_secs(1800));
    let first = manager.issue("A", "https://a", perms(&["balance"]), HOUR);
    let second = manager.issue("B", "https://b", perms(&["balance"]), HOUR);

    manager.revoke(&first.token);
    let third = manager.issue("C", "https://c", perms(&["balance"]), HOUR);

    // The revoked slot absorbed the overflow; B must survive.
    assert!(manager.validate(&second.token).is_ok());
    assert!(manager.validate(&third.token).is_ok());
}

#[tokio::test]
async fn test_lock_revokes_everything_and_publishes() {
    let events = Arc::new(EventBroadcaster::new());
    let config = ProtocolConfig::default();
    let manager = SessionManager::new(
        &config,
        Arc::new(WalletLockState::new(false)),
        events.clone(),
    );
    let mut listener = events.subscribe();

    let a = manager.issue("A", "https://a", perms(&["balance"]), HOUR);
    let b = manager.issue("B", "https://b", perms(&["wallet_info"]), HOUR);
    assert!(manager.validate(&a.token).is_ok());

    manager.lock();

    assert!(manager.is_locked());
    assert!(manager.validate(&a.token).is_err());
    assert!(manager.validate(&b.token).is_err());
    assert_eq!(listener.recv().await, Some(WalletEvent::WalletLocked));

    // Locking again is a no-op: no second event.
    manager.lock();
    assert!(listener.try_recv().is_none());
}

#[tokio::test]
async fn test_unlock_checks_password() {
    let events = Arc::new(EventBroadcaster::new());
    let config = ProtocolConfig::default();
    let manager = SessionManager::new(
        &config,
        Arc::new(WalletLockState::new(true)),
        events.clone(),
    );
    let wallet = DevWallet::new("hunter2");
    let mut listener = events.subscribe();

    let err = manager.unlock("wrong", &wallet).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(manager.is_locked());

    manager.unlock("hunter2", &wallet).await.unwrap();
    assert!(!manager.is_locked());
    assert_eq!(listener.recv().await, Some(WalletEvent::WalletUnlocked));
}

#[test]
fn test_lock_if_idle() {
    let idle = manager_with(100, Duration::ZERO);
    assert!(idle.lock_if_idle());
    assert!(idle.is_locked());
    // Already locked: reports false.
    assert!(!idle.lock_if_idle());

    let busy = manager_with(100, Duration::from_secs(3600));
    assert!(!busy.lock_if_idle());
    assert!(!busy.is_locked());
}

#[test]
fn test_validate_resets_idle_deadline() {
    let manager = manager_with(100, Duration::from_secs(3600));
    let session = manager.issue("A", "https://a", perms(&["balance"]), HOUR);

    let before = manager.idle_deadline();
    std::thread::sleep(Duration::from_millis(5));
    manager.validate(&session.token).unwrap();
    assert!(manager.idle_deadline() > before);
}
