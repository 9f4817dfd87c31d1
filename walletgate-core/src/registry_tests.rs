use super::*;
use crate::permission::{Permission, WalletLockState};

fn perms(names: &[&str]) -> PermissionSet {
    PermissionSet::from_strs(names).unwrap()
}

struct Fixture {
    registry: AuthorizationRegistry,
    sessions: Arc<SessionManager>,
    events: Arc<EventBroadcaster>,
}

fn fixture() -> Fixture {
    fixture_with(ProtocolConfig::default())
}

fn fixture_with(config: ProtocolConfig) -> Fixture {
    let events = Arc::new(EventBroadcaster::new());
    let sessions = Arc::new(SessionManager::new(
        &config,
        Arc::new(WalletLockState::new(false)),
        events.clone(),
    ));
    let registry = AuthorizationRegistry::new(&config, sessions.clone(), events.clone());
    Fixture {
        registry,
        sessions,
        events,
    }
}

fn expiring_config() -> ProtocolConfig {
    ProtocolConfig {
        request_ttl: Duration::ZERO,
        request_gc_grace: Duration::ZERO,
        ..ProtocolConfig::default()
    }
}

#[tokio::test]
async fn test_create_request_publishes_and_is_pending() {
    let fx = fixture();
    let mut listener = fx.events.subscribe();

    let id = fx
        .registry
        .create_request(
            "Test DApp",
            "https://testdapp.example",
            perms(&["wallet_info", "balance"]),
            Some("demo".into()),
        )
        .unwrap();

    let status = fx.registry.poll_status(&id).unwrap();
    assert_eq!(status.status, AuthStatus::Pending);
    assert!(status.session_token.is_none());
    assert_eq!(status.permissions.len(), 2);

    match listener.recv().await {
        Some(WalletEvent::AuthorizationRequest {
            request_id,
            app_name,
            ..
        }) => {
            assert_eq!(request_id, id);
            assert_eq!(app_name, "Test DApp");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_listener_can_resolve_the_moment_the_event_arrives() {
    let fx = Arc::new(fixture());
    let mut listener = fx.events.subscribe();

    // A wallet UI reacting to the push must find the request registered.
    let approver = tokio::spawn({
        let fx = fx.clone();
        async move {
            match listener.recv().await {
                Some(WalletEvent::AuthorizationRequest { request_id, .. }) => {
                    fx.registry.approve(&request_id, None)
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    });

    let id = fx
        .registry
        .create_request("App", "https://app", perms(&["balance"]), None)
        .unwrap();

    let session = approver.await.unwrap().unwrap();
    assert!(fx.sessions.validate(&session.token).is_ok());
    assert_eq!(fx.registry.poll_status(&id).unwrap().status, AuthStatus::Approved);
}

#[test]
fn test_create_request_rejects_empty_set() {
    let fx = fixture();
    let err = fx
        .registry
        .create_request("App", "https://app", PermissionSet::new(), None)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidPermission(_)));
}

#[tokio::test]
async fn test_approve_issues_scoped_session() {
    let fx = fixture();
    let mut listener = fx.events.subscribe();
    let requested = perms(&["wallet_info", "balance"]);
    let id = fx
        .registry
        .create_request("App", "https://app", requested.clone(), None)
        .unwrap();
    let _ = listener.recv().await; // authorization_request

    let session = fx.registry.approve(&id, None).unwrap();
    assert_eq!(session.permissions, requested);
    assert!(session.permissions.is_subset_of(&requested));
    assert!(fx.sessions.validate(&session.token).is_ok());

    let status = fx.registry.poll_status(&id).unwrap();
    assert_eq!(status.status, AuthStatus::Approved);
    assert_eq!(status.session_token.as_deref(), Some(session.token.as_str()));

    match listener.recv().await {
        Some(WalletEvent::AuthorizationResolved {
            status,
            session_token,
            ..
        }) => {
            assert_eq!(status, AuthStatus::Approved);
            assert_eq!(session_token, Some(session.token));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_approve_may_narrow_never_widen() {
    let fx = fixture();
    let id = fx
        .registry
        .create_request("App", "https://app", perms(&["wallet_info", "balance"]), None)
        .unwrap();

    // Widening is rejected and leaves the request pending.
    let err = fx
        .registry
        .approve(&id, Some(perms(&["balance", "sign_message"])))
        .unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidPermission(_)));
    assert_eq!(fx.registry.poll_status(&id).unwrap().status, AuthStatus::Pending);

    // Narrowing succeeds.
    let session = fx.registry.approve(&id, Some(perms(&["balance"]))).unwrap();
    assert!(session.permissions.contains(Permission::Balance));
    assert!(!session.permissions.contains(Permission::WalletInfo));
}

#[tokio::test]
async fn test_deny_resolves_without_token() {
    let fx = fixture();
    let id = fx
        .registry
        .create_request("App", "https://app", perms(&["balance"]), None)
        .unwrap();

    fx.registry.deny(&id).unwrap();
    let status = fx.registry.poll_status(&id).unwrap();
    assert_eq!(status.status, AuthStatus::Denied);
    assert!(status.session_token.is_none());
    assert_eq!(fx.sessions.session_count(), 0);
}

#[test]
fn test_resolving_twice_is_invalid_state() {
    let fx = fixture();
    let id = fx
        .registry
        .create_request("App", "https://app", perms(&["balance"]), None)
        .unwrap();

    fx.registry.approve(&id, None).unwrap();
    assert!(matches!(
        fx.registry.approve(&id, None).unwrap_err(),
        ProtocolError::InvalidState(_)
    ));
    assert!(matches!(
        fx.registry.deny(&id).unwrap_err(),
        ProtocolError::InvalidState(_)
    ));
}

#[test]
fn test_unknown_request_is_not_found() {
    let fx = fixture();
    assert!(matches!(
        fx.registry.approve("nope", None).unwrap_err(),
        ProtocolError::NotFound(_)
    ));
    assert!(matches!(
        fx.registry.poll_status("nope").unwrap_err(),
        ProtocolError::NotFound(_)
    ));
}

#[test]
fn test_stale_pending_expires_on_poll() {
    let fx = fixture_with(expiring_config());
    let id = fx
        .registry
        .create_request("App", "https://app", perms(&["balance"]), None)
        .unwrap();

    std::thread::sleep(Duration::from_millis(5));
    let status = fx.registry.poll_status(&id).unwrap();
    assert_eq!(status.status, AuthStatus::Expired);

    // Expired requests can no longer be approved.
    assert!(matches!(
        fx.registry.approve(&id, None).unwrap_err(),
        ProtocolError::InvalidState(_)
    ));
}

#[test]
fn test_pending_listing_oldest_first() {
    let fx = fixture();
    let first = fx
        .registry
        .create_request("A", "https://a", perms(&["balance"]), None)
        .unwrap();
    let second = fx
        .registry
        .create_request("B", "https://b", perms(&["balance"]), None)
        .unwrap();
    fx.registry.deny(&second).unwrap();
    let third = fx
        .registry
        .create_request("C", "https://c", perms(&["balance"]), None)
        .unwrap();

    let pending: Vec<String> = fx
        .registry
        .pending_requests()
        .into_iter()
        .map(|request| request.request_id)
        .collect();
    assert_eq!(pending, vec![first, third]);
}

#[test]
fn test_sweep_purges_settled_requests() {
    let fx = fixture_with(expiring_config());
    fx.registry
        .create_request("A", "https://a", perms(&["balance"]), None)
        .unwrap();

    std::thread::sleep(Duration::from_millis(5));
    fx.registry.sweep();
    assert_eq!(fx.registry.request_count(), 0);
}

#[test]
fn test_sweep_keeps_fresh_requests() {
    let fx = fixture();
    let pending = fx
        .registry
        .create_request("A", "https://a", perms(&["balance"]), None)
        .unwrap();
    let resolved = fx
        .registry
        .create_request("B", "https://b", perms(&["balance"]), None)
        .unwrap();
    fx.registry.deny(&resolved).unwrap();

    fx.registry.sweep();
    // Pending stays; the denied one is still within its grace period.
    assert_eq!(fx.registry.request_count(), 2);
    assert_eq!(fx.registry.poll_status(&pending).unwrap().status, AuthStatus::Pending);
}
