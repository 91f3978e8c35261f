//! Common test utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use matrix_registration_proxy::{
    api::{create_router, AppState},
    proxy::Passthrough,
    HomeserverClient,
};
use secrecy::SecretString;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::MockServer;

pub const INVITE_CODE: &str = "secret";

/// Start a mock homeserver.
pub async fn mock_homeserver() -> MockServer {
    MockServer::start().await
}

/// Build the gateway router against `homeserver_url`.
pub fn test_app(homeserver_url: &str, invite_code: &str) -> Router {
    test_app_with_timeout(homeserver_url, invite_code, Duration::from_secs(5))
}

pub fn test_app_with_timeout(homeserver_url: &str, invite_code: &str, timeout: Duration) -> Router {
    let homeserver = HomeserverClient::new(homeserver_url, timeout).unwrap();
    let passthrough = Passthrough::new(homeserver_url, timeout).unwrap();
    create_router(AppState::new(
        SecretString::new(invite_code.to_string()),
        homeserver,
        passthrough,
    ))
}

/// POST a JSON body to `/api/register` and decode the JSON reply.
pub async fn post_register(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/register")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap();
    (status, json)
}
