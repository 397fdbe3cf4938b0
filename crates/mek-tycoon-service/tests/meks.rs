//! Mek slotting and tenure integration tests.

mod common;

use chrono::{Duration, Utc};
use common::{wallet, TestHarness, ADMIN_API_KEY};
use serde_json::json;

use mek_tycoon_core::MekNumber;
use mek_tycoon_store::Store;

async fn slot(harness: &TestHarness, mek: u16, slot_number: u8) -> axum_test::TestResponse {
    harness
        .server
        .post(&format!("/v1/meks/{mek}/slot"))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "slot_number": slot_number }))
        .await
}

#[tokio::test]
async fn slot_and_unslot() {
    let harness = TestHarness::new();
    harness.seed_verified(&harness.wallet, &[1, 2], 1000);

    let response = slot(&harness, 1, 1).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_slotted"], true);
    assert_eq!(body["slot_number"], 1);
    assert_eq!(body["tenure_rate"], 360_000);

    // Slot 1 is taken.
    let response = slot(&harness, 2, 1).await;
    assert_eq!(response.status_code(), 409);

    // Already slotted.
    let response = slot(&harness, 1, 2).await;
    assert_eq!(response.status_code(), 409);

    let response = harness
        .server
        .post("/v1/meks/1/unslot")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_slotted"], false);

    let response = harness
        .server
        .post("/v1/meks/1/unslot")
        .add_header("authorization", harness.user_auth_header())
        .await;
    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn meks_of_other_wallets_are_forbidden() {
    let harness = TestHarness::new();
    harness.seed_verified(&harness.wallet, &[1], 1000);
    harness.seed_verified(&wallet("b"), &[7], 1000);

    let response = slot(&harness, 7, 1).await;
    assert_eq!(response.status_code(), 403);

    let response = slot(&harness, 9999, 1).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn tenure_accrues_while_slotted() {
    let harness = TestHarness::new();
    harness.seed_verified(&harness.wallet, &[3], 1000);
    slot(&harness, 3, 1).await.assert_status_ok();

    let number = MekNumber::new(3).unwrap();
    let mut mek = harness.store.get_mek(number).unwrap().unwrap();
    mek.last_tenure_update = Some(Utc::now() - Duration::hours(2));
    harness.store.put_mek(&mek).unwrap();

    let response = harness
        .server
        .get("/v1/meks")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let meks: serde_json::Value = response.json();
    assert!(meks[0]["tenure"].as_u64().unwrap() >= 720_000);
}

#[tokio::test]
async fn level_up_spends_tenure_and_carries_over() {
    let harness = TestHarness::new();
    harness.seed_verified(&harness.wallet, &[5], 1000);

    harness
        .server
        .put("/v1/admin/tenure/settings")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({
            "base_rate_per_hour": 360_000,
            "cap": "unlimited",
            "level_thresholds": { "2": 100, "3": 200 }
        }))
        .await
        .assert_status_ok();

    let number = MekNumber::new(5).unwrap();
    let mut mek = harness.store.get_mek(number).unwrap().unwrap();
    mek.tenure_points = 250;
    harness.store.put_mek(&mek).unwrap();

    let response = harness
        .server
        .post("/v1/meks/5/level-up")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["outcome"]["status"], "leveled_up");
    assert_eq!(body["outcome"]["new_level"], 2);
    assert_eq!(body["outcome"]["tenure_remaining"], 150);
    assert_eq!(body["mek"]["next_level_threshold"], 200);

    let response = harness
        .server
        .post("/v1/meks/5/level-up")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "max_levels": 5 }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["outcome"]["status"], "not_enough_tenure");
    assert_eq!(body["outcome"]["required"], 200);

    let mut mek = harness.store.get_mek(number).unwrap().unwrap();
    mek.tenure_points = 10_000;
    harness.store.put_mek(&mek).unwrap();

    // Level 4 has no threshold, so the batch stops at 3.
    let response = harness
        .server
        .post("/v1/meks/5/level-up")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "max_levels": 5 }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["outcome"]["new_level"], 3);

    let response = harness
        .server
        .post("/v1/meks/5/level-up")
        .add_header("authorization", harness.user_auth_header())
        .await;
    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn buffs_rerate_slotted_meks() {
    let harness = TestHarness::new();
    harness.seed_verified(&harness.wallet, &[8], 1000);
    slot(&harness, 8, 1).await.assert_status_ok();

    let response = harness
        .server
        .post("/v1/admin/tenure/buffs")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "scope": { "kind": "global" }, "bonus_bps": 5000 }))
        .await;
    response.assert_status_ok();
    let buff: serde_json::Value = response.json();

    let mek = harness.store.get_mek(MekNumber::new(8).unwrap()).unwrap().unwrap();
    assert_eq!(mek.tenure_rate, 540_000);

    harness
        .server
        .delete(&format!("/v1/admin/tenure/buffs/{}", buff["id"].as_str().unwrap()))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await
        .assert_status_ok();

    let mek = harness.store.get_mek(MekNumber::new(8).unwrap()).unwrap().unwrap();
    assert_eq!(mek.tenure_rate, 360_000);
}
