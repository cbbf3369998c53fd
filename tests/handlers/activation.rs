use serde_json::json;

use seatpulse::db::queries;
use seatpulse::license_key;

use crate::common::*;

#[tokio::test]
async fn activation_requires_authentication() {
    let app = test_app();
    let req = json!({
        "licenseKey": license_key::generate("MOUSE").unwrap(),
        "fingerprint": "fp-1",
    });
    let (status, body) = send(&app.state, "POST", "/license/activate", Some(req), None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn malformed_key_is_a_bad_request() {
    let app = test_app();
    let token = portal_token(&app.state, "user_1", "u1@example.com");
    let req = json!({ "licenseKey": "nope", "fingerprint": "fp-1" });
    let (status, _) = send(&app.state, "POST", "/license/activate", Some(req), Some(&token)).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn unknown_key_is_not_found() {
    // Unlike the heartbeat route, activation has no fail-open path.
    let app = test_app();
    let token = portal_token(&app.state, "user_1", "u1@example.com");
    let req = json!({
        "licenseKey": license_key::generate("MOUSE").unwrap(),
        "fingerprint": "fp-1",
    });
    let (status, body) = send(&app.state, "POST", "/license/activate", Some(req), Some(&token)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "license key not found");
}

#[tokio::test]
async fn activation_binds_the_verified_subject_and_counts_it() {
    let app = test_app();
    let key = key_for_body("MOUSE", "ACTV0001AAAA");
    let license = seed_license(&app.state, &key, Some(3));
    let token = portal_token(&app.state, "user_owner", "owner@example.com");

    let req = json!({
        "licenseKey": key,
        "fingerprint": "fp-new",
        "name": "Work laptop",
        "platform": "macos",
    });
    let (status, body) = send(&app.state, "POST", "/license/activate", Some(req), Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["valid"], true);
    assert_eq!(body["status"], "active");
    assert_eq!(body["concurrentMachines"], 1);
    assert_eq!(body["maxMachines"], 3);

    let conn = app.state.db.get().unwrap();
    let device = queries::get_device(&conn, &license.license_id, "fp-new")
        .unwrap()
        .unwrap();
    assert_eq!(device.user_id.as_deref(), Some("user_owner"));
    assert_eq!(device.name.as_deref(), Some("Work laptop"));

    let stored = queries::get_license_by_key(&conn, &key).unwrap().unwrap();
    assert_eq!(stored.activated_devices, 1);
}

#[tokio::test]
async fn new_fingerprint_over_the_limit_is_refused() {
    let app = test_app();
    let key = key_for_body("MOUSE", "ACTV0002BBBB");
    let license = seed_license(&app.state, &key, Some(1));
    seed_device(&app.state, &license.license_id, "fp-existing", queries::now() - 60);

    let token = portal_token(&app.state, "user_owner", "owner@example.com");
    let req = json!({ "licenseKey": key, "fingerprint": "fp-second" });
    let (status, body) = send(&app.state, "POST", "/license/activate", Some(req), Some(&token)).await;

    assert_eq!(status, 403);
    assert_eq!(body["valid"], false);
    assert_eq!(body["status"], "device_limit_exceeded");
    assert_eq!(body["concurrentMachines"], 1);
    assert_eq!(body["maxMachines"], 1);
    assert!(body["reason"].as_str().unwrap().contains("device limit exceeded"));

    // The refused fingerprint was never written.
    let conn = app.state.db.get().unwrap();
    assert!(queries::get_device(&conn, &license.license_id, "fp-second")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn reactivating_a_known_fingerprint_is_always_allowed() {
    let app = test_app();
    let key = key_for_body("MOUSE", "ACTV0003CCCC");
    let license = seed_license(&app.state, &key, Some(1));
    seed_device(&app.state, &license.license_id, "fp-a", queries::now() - 60);

    let token = portal_token(&app.state, "user_owner", "owner@example.com");
    let req = json!({ "licenseKey": key, "fingerprint": "fp-a" });
    let (status, body) = send(&app.state, "POST", "/license/activate", Some(req), Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["valid"], true);
    assert_eq!(body["status"], "active");

    // In-place refresh, not a second activation.
    let conn = app.state.db.get().unwrap();
    let stored = queries::get_license_by_key(&conn, &key).unwrap().unwrap();
    assert_eq!(stored.activated_devices, 0);
}

#[tokio::test]
async fn stale_devices_free_up_activation_slots() {
    let app = test_app();
    let key = key_for_body("MOUSE", "ACTV0004DDDD");
    let license = seed_license(&app.state, &key, Some(1));
    // Seen 3h ago, outside the 2h window.
    seed_device(&app.state, &license.license_id, "fp-stale", queries::now() - 3 * 3600);

    let token = portal_token(&app.state, "user_owner", "owner@example.com");
    let req = json!({ "licenseKey": key, "fingerprint": "fp-fresh" });
    let (status, body) = send(&app.state, "POST", "/license/activate", Some(req), Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "active");
    assert_eq!(body["concurrentMachines"], 1);
}
