use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::*;

fn status_of(error: ServerError) -> StatusCode {
    error.into_response().status()
}

#[test]
fn test_protocol_error_status_mapping() {
    let cases = [
        (
            ProtocolError::InvalidPermission("x".into()),
            StatusCode::BAD_REQUEST,
        ),
        (
            ProtocolError::InvalidState("x".into()),
            StatusCode::BAD_REQUEST,
        ),
        (ProtocolError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (
            ProtocolError::Unauthorized("x".into()),
            StatusCode::UNAUTHORIZED,
        ),
        (ProtocolError::Forbidden("x".into()), StatusCode::FORBIDDEN),
        (ProtocolError::Locked, StatusCode::LOCKED),
        (
            ProtocolError::Backend("x".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(status_of(ServerError::Protocol(error)), expected);
    }
}

#[test]
fn test_invalid_request_is_bad_request() {
    let error = ServerError::InvalidRequest("missing app_name".into());
    assert_eq!(status_of(error), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_carries_message_and_code() {
    let response = ServerError::Protocol(ProtocolError::Locked).into_response();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["code"], "WALLET_LOCKED");
    assert_eq!(body["error"], "wallet is locked");
}
