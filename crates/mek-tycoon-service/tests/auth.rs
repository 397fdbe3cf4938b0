//! Wallet sign-in integration tests.

mod common;

use ciborium::Value;
use common::{wallet, TestHarness};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::json;

use mek_tycoon_core::StakeAddress;
use mek_tycoon_store::Store;
use mek_tycoon_service::crypto::{sig_structure, stake_address_for_key};

fn encode(value: &Value) -> String {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).unwrap();
    hex::encode(buf)
}

/// Sign `message` the way a CIP-30 wallet's `signData` does.
fn sign_data(signing_key: &SigningKey, message: &str) -> (String, String) {
    let mut protected = Vec::new();
    ciborium::into_writer(
        &Value::Map(vec![(Value::Integer(1.into()), Value::Integer((-8).into()))]),
        &mut protected,
    )
    .unwrap();
    let to_sign = sig_structure(protected.clone(), message.as_bytes().to_vec()).unwrap();
    let signature = signing_key.sign(&to_sign);

    let sign1 = Value::Array(vec![
        Value::Bytes(protected),
        Value::Map(vec![]),
        Value::Bytes(message.as_bytes().to_vec()),
        Value::Bytes(signature.to_bytes().to_vec()),
    ]);
    let key = Value::Map(vec![
        (Value::Integer(1.into()), Value::Integer(1.into())),
        (Value::Integer(3.into()), Value::Integer((-8).into())),
        (Value::Integer((-1).into()), Value::Integer(6.into())),
        (
            Value::Integer((-2).into()),
            Value::Bytes(signing_key.verifying_key().to_bytes().to_vec()),
        ),
    ]);
    (encode(&sign1), encode(&key))
}

/// The stake address a wallet holding `signing_key` signs for.
fn address_of(signing_key: &SigningKey) -> StakeAddress {
    stake_address_for_key(&signing_key.verifying_key().to_bytes())
        .unwrap()
        .parse()
        .unwrap()
}

async fn request_nonce(harness: &TestHarness, wallet: &StakeAddress) -> serde_json::Value {
    let response = harness
        .server
        .post("/v1/auth/nonce")
        .json(&json!({
            "stake_address": wallet.to_string(),
            "wallet_name": "eternl",
            "origin": "https://mek.overexposed.io"
        }))
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn sign_in_issues_a_working_session() {
    let harness = TestHarness::new();
    let key = SigningKey::from_bytes(&[3u8; 32]);
    let signer = address_of(&key);

    let nonce = request_nonce(&harness, &signer).await;
    let message = nonce["message"].as_str().unwrap();
    assert!(message.contains(nonce["nonce"].as_str().unwrap()));

    let (signature, cose_key) = sign_data(&key, message);
    let response = harness
        .server
        .post("/v1/auth/verify")
        .json(&json!({
            "stake_address": signer.to_string(),
            "nonce": nonce["nonce"],
            "signature": signature,
            "key": cose_key
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["wallet"], signer.to_string());
    assert_eq!(body["account_created"], true);

    let token = body["token"].as_str().unwrap();
    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn nonce_cannot_be_replayed() {
    let harness = TestHarness::new();
    let key = SigningKey::from_bytes(&[3u8; 32]);
    let signer = address_of(&key);

    let nonce = request_nonce(&harness, &signer).await;
    let (signature, cose_key) = sign_data(&key, nonce["message"].as_str().unwrap());
    let body = json!({
        "stake_address": signer.to_string(),
        "nonce": nonce["nonce"],
        "signature": signature,
        "key": cose_key
    });

    harness
        .server
        .post("/v1/auth/verify")
        .json(&body)
        .await
        .assert_status_ok();

    let response = harness.server.post("/v1/auth/verify").json(&body).await;
    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "auth_failed");
}

#[tokio::test]
async fn wrong_message_signature_is_rejected() {
    let harness = TestHarness::new();
    let key = SigningKey::from_bytes(&[3u8; 32]);
    let signer = address_of(&key);

    let nonce = request_nonce(&harness, &signer).await;
    let (signature, cose_key) = sign_data(&key, "something else");

    let response = harness
        .server
        .post("/v1/auth/verify")
        .json(&json!({
            "stake_address": signer.to_string(),
            "nonce": nonce["nonce"],
            "signature": signature,
            "key": cose_key
        }))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn repeated_failures_lock_the_wallet() {
    let harness = TestHarness::new();
    let key = SigningKey::from_bytes(&[3u8; 32]);
    let signer = address_of(&key);
    let nonce = request_nonce(&harness, &signer).await;
    let (signature, cose_key) = sign_data(&key, nonce["message"].as_str().unwrap());

    for _ in 0..10 {
        harness
            .server
            .post("/v1/auth/verify")
            .json(&json!({
                "stake_address": signer.to_string(),
                "nonce": "wrong-nonce",
                "signature": signature,
                "key": cose_key
            }))
            .await
            .assert_status_unauthorized();
    }

    let response = harness
        .server
        .post("/v1/auth/nonce")
        .json(&json!({
            "stake_address": signer.to_string(),
            "wallet_name": "eternl"
        }))
        .await;
    assert_eq!(response.status_code(), 429);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "locked_out");
}

#[tokio::test]
async fn key_must_belong_to_the_stake_address() {
    let harness = TestHarness::new();
    let victim = wallet("a");
    let attacker = SigningKey::from_bytes(&[0x42; 32]);

    // The attacker's own valid signature over the victim's nonce.
    let nonce = request_nonce(&harness, &victim).await;
    let (signature, cose_key) = sign_data(&attacker, nonce["message"].as_str().unwrap());

    let response = harness
        .server
        .post("/v1/auth/verify")
        .json(&json!({
            "stake_address": victim.to_string(),
            "nonce": nonce["nonce"],
            "signature": signature,
            "key": cose_key
        }))
        .await;
    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "auth_failed");

    assert!(harness.store.get_account(&victim).unwrap().is_none());
    let attempts = harness.store.get_auth_state(&victim).unwrap().attempts;
    assert_eq!(attempts.failures.len(), 1);
}

#[tokio::test]
async fn invalid_stake_address_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/auth/nonce")
        .json(&json!({
            "stake_address": "stake_test1uqfu74w3wh4gfzu8m6e7j987h4lq9r3t7ef5gaw497uu85qsqfy27",
            "wallet_name": "nami"
        }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn bad_session_token_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", "Bearer not-a-jwt")
        .await;
    response.assert_status_unauthorized();

    let other = wallet("b");
    let session =
        mek_tycoon_service::auth::issue_session("another-secret", &other, chrono::Utc::now())
            .unwrap();
    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", format!("Bearer {}", session.token))
        .await;
    response.assert_status_unauthorized();
}
