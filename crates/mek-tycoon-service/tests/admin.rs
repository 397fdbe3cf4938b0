//! Admin endpoint integration tests.

mod common;

use common::{wallet, TestHarness, ADMIN_API_KEY};
use serde_json::json;

#[tokio::test]
async fn admin_key_is_required() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/admin/campaigns").await;
    response.assert_status_unauthorized();

    let response = harness
        .server
        .get("/v1/admin/campaigns")
        .add_header("x-admin-key", "not-the-key")
        .await;
    response.assert_status_unauthorized();

    // A player session is not an admin credential.
    let response = harness
        .server
        .get("/v1/admin/campaigns")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn gold_rate_curve_defaults_and_validates() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/admin/gold-rate-curve")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    response.assert_status_ok();
    let mut curve: serde_json::Value = response.json();
    assert_eq!(curve["curve_type"], "linear");

    curve["curve_type"] = json!("sigmoid");
    let response = harness
        .server
        .put("/v1/admin/gold-rate-curve")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&curve)
        .await;
    response.assert_status_ok();

    let response = harness
        .server
        .get("/v1/admin/gold-rate-curve")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    let stored: serde_json::Value = response.json();
    assert_eq!(stored["curve_type"], "sigmoid");

    curve["min_gold"] = json!(500.0);
    curve["max_gold"] = json!(10.0);
    let response = harness
        .server
        .put("/v1/admin/gold-rate-curve")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&curve)
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn tenure_thresholds_must_start_at_level_two() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .put("/v1/admin/tenure/settings")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({
            "base_rate_per_hour": 360_000,
            "cap": "unlimited",
            "level_thresholds": { "1": 100 }
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn buffs_are_listed_and_deleted() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/admin/tenure/buffs")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "scope": { "kind": "global" }, "bonus_bps": 2_500 }))
        .await;
    response.assert_status_ok();
    let buff: serde_json::Value = response.json();
    let id = buff["id"].as_str().unwrap().to_string();

    let response = harness
        .server
        .get("/v1/admin/tenure/buffs")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    let buffs: Vec<serde_json::Value> = response.json();
    assert_eq!(buffs.len(), 1);

    harness
        .server
        .delete(&format!("/v1/admin/tenure/buffs/{id}"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await
        .assert_status_ok();

    let response = harness
        .server
        .delete(&format!("/v1/admin/tenure/buffs/{id}"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn zero_mek_accounts_are_deleted() {
    let harness = TestHarness::new();
    harness.seed_verified(&wallet("a"), &[1], 1_000);
    harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", TestHarness::auth_header_for(&wallet("b")))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/admin/cleanup/zero-mek-accounts")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["deleted"], 1);
    assert_eq!(body["wallets"][0], wallet("b").to_string());

    let response = harness
        .server
        .post("/v1/admin/cleanup/mock-accounts")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["deleted"], 0);

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn reset_verification_stops_accrual() {
    let harness = TestHarness::new();
    harness.seed_verified(&harness.wallet, &[1], 1_000);

    let response = harness
        .server
        .post(&format!(
            "/v1/admin/accounts/{}/reset-verification",
            harness.wallet
        ))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_blockchain_verified"], false);
    assert_eq!(body["owned_meks"].as_array().unwrap().len(), 1);

    let response = harness
        .server
        .post("/v1/admin/accounts/not-a-wallet/reset-verification")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn campaign_admin_lifecycle() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/admin/campaigns")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "name": "  ", "project_id": "p", "max_nfts": 2 }))
        .await;
    response.assert_status_bad_request();

    let response = harness
        .server
        .post("/v1/admin/campaigns")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "name": "Drop", "project_id": "p", "max_nfts": 2 }))
        .await;
    let campaign: serde_json::Value = response.json();
    let id = campaign["id"].as_str().unwrap().to_string();

    // Activating an empty campaign fails.
    let response = harness
        .server
        .post(&format!("/v1/admin/campaigns/{id}/activate"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    response.assert_status_bad_request();

    // More items than max_nfts.
    let items: Vec<_> = (1..=3)
        .map(|n| json!({ "nft_uid": format!("uid-{n}"), "nft_number": n, "name": format!("#{n}") }))
        .collect();
    let response = harness
        .server
        .post(&format!("/v1/admin/campaigns/{id}/inventory"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "items": items }))
        .await;
    response.assert_status_bad_request();

    let response = harness
        .server
        .post(&format!("/v1/admin/campaigns/{id}/inventory"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "items": &items[..2] }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["items"], 2);
    assert_eq!(body["campaign"]["available_nfts"], 2);

    // Shrinking below the loaded inventory is rejected.
    let response = harness
        .server
        .patch(&format!("/v1/admin/campaigns/{id}"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "max_nfts": 1 }))
        .await;
    response.assert_status_bad_request();

    harness
        .server
        .post(&format!("/v1/admin/campaigns/{id}/activate"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&format!("/v1/campaigns/{id}/reservations"))
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    let reservation = body["reservation"]["id"].as_str().unwrap().to_string();

    let response = harness
        .server
        .get(&format!("/v1/admin/campaigns/{id}/reservations?status=active"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    let listed: Vec<serde_json::Value> = response.json();
    assert_eq!(listed.len(), 1);

    let response = harness
        .server
        .post(&format!("/v1/admin/reservations/{reservation}/complete"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "transaction_hash": "manual" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "completed");

    let response = harness
        .server
        .post(&format!("/v1/admin/campaigns/{id}/cleanup"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["expired"], 0);

    let response = harness
        .server
        .get(&format!("/v1/admin/campaigns/{id}"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    let book: serde_json::Value = response.json();
    assert_eq!(book["campaign"]["sold_nfts"], 1);
    assert_eq!(book["inventory"].as_array().unwrap().len(), 2);
}
