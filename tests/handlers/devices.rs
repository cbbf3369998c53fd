use serde_json::json;

use seatpulse::db::queries;
use seatpulse::models::*;

use crate::common::*;

fn seed_owner_with_license(app: &TestApp, key_body: &str) -> (License, String) {
    let key = key_for_body("MOUSE", key_body);
    let license = seed_license(&app.state, &key, Some(5));
    let mut owner = customer("user_owner", "owner@example.com");
    owner.license_id = Some(license.license_id.clone());
    owner.subscription_status = Some(SubscriptionStatus::Active);
    seed_customer(&app.state, &owner);
    (license, key)
}

#[tokio::test]
async fn invalid_portal_token_is_unauthorized() {
    let app = test_app();
    let (status, _) = send(&app.state, "GET", "/portal/devices", None, Some("garbage")).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn missing_credentials_are_unauthorized_not_bad_request() {
    let app = test_app();

    let (status, body) = send(&app.state, "GET", "/portal/devices", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "authentication required");

    let (status, body) = send(
        &app.state,
        "POST",
        "/portal/devices/deactivate",
        Some(json!({ "fingerprint": "fp-1" })),
        None,
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn account_without_a_license_is_not_found() {
    let app = test_app();
    seed_customer(&app.state, &customer("user_bare", "bare@example.com"));
    let token = portal_token(&app.state, "user_bare", "bare@example.com");
    let (status, body) = send(&app.state, "GET", "/portal/devices", None, Some(&token)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "no license associated with this account");
}

#[tokio::test]
async fn direct_license_devices_are_listed_with_activity_flags() {
    let app = test_app();
    let (license, _) = seed_owner_with_license(&app, "DEVS0001AAAA");
    let now = queries::now();
    seed_device(&app.state, &license.license_id, "fp-fresh", now - 60);
    seed_device(&app.state, &license.license_id, "fp-stale", now - 3 * 3600);

    let token = portal_token(&app.state, "user_owner", "owner@example.com");
    let (status, body) = send(&app.state, "GET", "/portal/devices", None, Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["accountType"], "individual");
    assert_eq!(body["hasSubscription"], true);
    assert_eq!(body["source"], "direct");
    assert!(body.get("org").is_none());
    assert_eq!(body["maxDevices"], 5);
    assert_eq!(body["activeDevices"], 1);

    let devices = body["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
    for d in devices {
        let expected_active = d["fingerprint"] == "fp-fresh";
        assert_eq!(d["active"], expected_active, "device {}", d["fingerprint"]);
    }
}

#[tokio::test]
async fn org_member_inherits_the_owners_license() {
    let app = test_app();
    let (license, _) = seed_owner_with_license(&app, "DEVS0002BBBB");
    {
        let conn = app.state.db.get().unwrap();
        queries::put_organization(
            &conn,
            &Organization {
                org_id: "org_1".to_string(),
                owner_user_id: "user_owner".to_string(),
                owner_email: "owner@example.com".to_string(),
                seat_limit: Some(10),
                name: Some("Acme".to_string()),
                created_at: queries::now(),
            },
        )
        .unwrap();
        queries::put_membership(
            &conn,
            &Membership {
                org_id: "org_1".to_string(),
                member_id: "user_member".to_string(),
                email: "member@example.com".to_string(),
                role: Some(MemberRole::Admin),
                status: MemberStatus::Active,
                joined_at: queries::now(),
            },
        )
        .unwrap();
    }
    seed_device(&app.state, &license.license_id, "fp-1", queries::now() - 60);

    let token = portal_token(&app.state, "user_member", "member@example.com");
    let (status, body) = send(&app.state, "GET", "/portal/devices", None, Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["source"], "org");
    assert_eq!(body["org"]["orgId"], "org_1");
    assert_eq!(body["org"]["orgName"], "Acme");
    assert_eq!(body["org"]["memberRole"], "admin");
    assert_eq!(body["devices"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deactivating_a_device_removes_it_and_reports_the_remainder() {
    let app = test_app();
    let (license, _) = seed_owner_with_license(&app, "DEVS0003CCCC");
    let now = queries::now();
    seed_device(&app.state, &license.license_id, "fp-1", now - 60);
    seed_device(&app.state, &license.license_id, "fp-2", now - 120);

    let token = portal_token(&app.state, "user_owner", "owner@example.com");
    let (status, body) = send(
        &app.state,
        "POST",
        "/portal/devices/deactivate",
        Some(json!({ "fingerprint": "fp-1" })),
        Some(&token),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["deactivated"], true);
    assert_eq!(body["remainingDevices"], 1);

    let conn = app.state.db.get().unwrap();
    assert!(queries::get_device(&conn, &license.license_id, "fp-1")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn deactivating_an_unknown_fingerprint_is_not_found() {
    let app = test_app();
    seed_owner_with_license(&app, "DEVS0004DDDD");
    let token = portal_token(&app.state, "user_owner", "owner@example.com");
    let (status, body) = send(
        &app.state,
        "POST",
        "/portal/devices/deactivate",
        Some(json!({ "fingerprint": "fp-ghost" })),
        Some(&token),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "device not found");
}
