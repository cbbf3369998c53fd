//! Shared setup for handler tests: a tempfile-backed state and oneshot
//! request helpers.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use seatpulse::auth;
use seatpulse::config::Config;
use seatpulse::db::{AppState, queries};
use seatpulse::models::*;

pub struct TestApp {
    pub state: AppState,
    _dir: tempfile::TempDir,
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: dir
            .path()
            .join("seatpulse-test.db")
            .to_string_lossy()
            .into_owned(),
        jwt_secret: "test-secret-0123456789".to_string(),
        license_key_prefix: "MOUSE".to_string(),
        device_window_hours: 2,
        trial_days: 14,
        latest_version: Some("2.4.1".to_string()),
        ready_version: Some("2.4.1".to_string()),
        ready_update_url: Some("https://updates.example.com/2.4.1".to_string()),
        release_notes_url: None,
    };
    let state = AppState::new(config).expect("state");
    TestApp { state, _dir: dir }
}

pub fn portal_token(state: &AppState, subject: &str, email: &str) -> String {
    auth::issue_portal_token(&state.auth_key, subject, email, 1).expect("token")
}

pub async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let auth_header = bearer.map(|t| format!("Bearer {t}"));
    let response = send_raw(state, method, uri, body, auth_header.as_deref()).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

/// Like [`send`] but with a verbatim Authorization header and the full
/// response exposed, for scheme and header assertions.
pub async fn send_raw(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_header: Option<&str>,
) -> Response<axum::body::Body> {
    let app = seatpulse::handlers::app(state.clone());
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(header) = auth_header {
        builder = builder.header("Authorization", header);
    }
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    app.oneshot(request).await.expect("response")
}

pub fn seed_license(state: &AppState, key: &str, max_devices: Option<i64>) -> License {
    let conn = state.db.get().expect("conn");
    queries::create_license(&conn, "user_owner", key, max_devices).expect("license")
}

pub fn seed_device(state: &AppState, license_id: &str, fingerprint: &str, last_seen_at: i64) {
    let conn = state.db.get().expect("conn");
    queries::upsert_device(
        &conn,
        license_id,
        fingerprint,
        &queries::DeviceUpsert::default(),
        last_seen_at,
    )
    .expect("device");
}

pub fn seed_customer(state: &AppState, customer: &Customer) {
    let conn = state.db.get().expect("conn");
    queries::put_customer(&conn, customer).expect("customer");
}

pub fn customer(user_id: &str, email: &str) -> Customer {
    Customer {
        user_id: user_id.to_string(),
        email: email.to_string(),
        stripe_customer_id: None,
        license_id: None,
        account_type: AccountType::Individual,
        subscription_status: None,
        created_at: queries::now(),
    }
}

/// A well-formed key for a given body, sharing the production checksum.
pub fn key_for_body(prefix: &str, body: &str) -> String {
    assert_eq!(body.len(), 12);
    format!(
        "{prefix}-{}-{}-{}-{}",
        &body[0..4],
        &body[4..8],
        &body[8..12],
        seatpulse::license_key::checksum(body)
    )
}
