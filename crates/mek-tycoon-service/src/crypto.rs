//! Cryptographic utilities.
//!
//! - HMAC-SHA256 for payment webhook bodies
//! - Constant-time comparison for keys and signatures
//! - CIP-30 `COSE_Sign1` verification for wallet sign-in
//! - Stake address derivation from a wallet's public key

use bech32::{Bech32, Hrp};
use blake2::digest::consts::U28;
use blake2::{Blake2b, Digest};
use ciborium::value::{Integer, Value};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type Blake2b224 = Blake2b<U28>;

/// Bech32 prefix of mainnet reward addresses.
const STAKE_HRP: Hrp = Hrp::parse_unchecked("stake");

/// Header byte of a mainnet reward address backed by a key hash.
const STAKE_KEY_HASH_HEADER: u8 = 0xe1;

/// COSE header label of the public key bytes in an OKP `COSE_Key`.
const COSE_KEY_X: i64 = -2;

/// CBOR tag of a `COSE_Sign1` structure.
const COSE_SIGN1_TAG: u64 = 18;

/// Compute HMAC-SHA256 and return hex-encoded result.
///
/// # Panics
///
/// This function will never panic in practice. The `expect` call is guarded by
/// the invariant that HMAC-SHA256 accepts keys of any size per RFC 2104.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Why a wallet signature was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoseError {
    /// Input was not valid hex.
    #[error("invalid hex encoding")]
    Hex,

    /// Input was not valid CBOR.
    #[error("invalid CBOR: {0}")]
    Cbor(String),

    /// The CBOR did not have the expected shape.
    #[error("malformed {0}")]
    Malformed(&'static str),

    /// The key is not a 32-byte Ed25519 key.
    #[error("invalid public key")]
    InvalidKey,

    /// The signature does not verify.
    #[error("signature verification failed")]
    BadSignature,

    /// The signed payload is not the issued message.
    #[error("signed payload does not match the issued message")]
    PayloadMismatch,

    /// The signing key does not belong to the claimed stake address.
    #[error("signing key does not match the stake address")]
    AddressMismatch,
}

/// Mainnet stake address of an Ed25519 stake key.
///
/// The address is `e1 || blake2b-224(key)` encoded as bech32 with the
/// `stake` prefix.
///
/// # Errors
///
/// Returns [`CoseError::InvalidKey`] if the address cannot be encoded.
pub fn stake_address_for_key(key: &[u8; 32]) -> Result<String, CoseError> {
    let mut payload = Vec::with_capacity(29);
    payload.push(STAKE_KEY_HASH_HEADER);
    payload.extend_from_slice(&Blake2b224::digest(key));
    bech32::encode::<Bech32>(STAKE_HRP, &payload).map_err(|_| CoseError::InvalidKey)
}

/// Verify a CIP-30 `signData` result against the message that was issued.
///
/// `signature_hex` is the hex `COSE_Sign1` and `key_hex` the hex `COSE_Key`
/// returned by the wallet. The signature is checked over the
/// `Sig_structure` `["Signature1", protected, h'', payload]`, and the key
/// must hash to `stake_address`.
///
/// # Errors
///
/// Returns a [`CoseError`] describing the first check that failed.
pub fn verify_cip30_signature(
    signature_hex: &str,
    key_hex: &str,
    expected_message: &str,
    stake_address: &str,
) -> Result<(), CoseError> {
    let sign1 = decode_cbor(signature_hex)?;
    let (protected, payload, signature) = split_sign1(sign1)?;

    if payload != expected_message.as_bytes() {
        return Err(CoseError::PayloadMismatch);
    }

    let key = cose_key_bytes(decode_cbor(key_hex)?)?;
    if stake_address_for_key(&key)? != stake_address {
        return Err(CoseError::AddressMismatch);
    }
    let verifying_key = VerifyingKey::from_bytes(&key).map_err(|_| CoseError::InvalidKey)?;
    let signature = Signature::from_slice(&signature).map_err(|_| CoseError::BadSignature)?;

    let to_verify = sig_structure(protected, payload)?;
    verifying_key
        .verify(&to_verify, &signature)
        .map_err(|_| CoseError::BadSignature)
}

/// CBOR encoding of the `Sig_structure` for a `COSE_Sign1`.
///
/// # Errors
///
/// Returns [`CoseError::Cbor`] if encoding fails.
pub fn sig_structure(protected: Vec<u8>, payload: Vec<u8>) -> Result<Vec<u8>, CoseError> {
    let structure = Value::Array(vec![
        Value::Text("Signature1".to_string()),
        Value::Bytes(protected),
        Value::Bytes(Vec::new()),
        Value::Bytes(payload),
    ]);
    let mut buf = Vec::new();
    ciborium::into_writer(&structure, &mut buf).map_err(|e| CoseError::Cbor(e.to_string()))?;
    Ok(buf)
}

fn decode_cbor(input: &str) -> Result<Value, CoseError> {
    let bytes = hex::decode(input.trim()).map_err(|_| CoseError::Hex)?;
    ciborium::from_reader(bytes.as_slice()).map_err(|e| CoseError::Cbor(e.to_string()))
}

/// Split a `COSE_Sign1` into protected header bytes, payload and signature.
fn split_sign1(value: Value) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), CoseError> {
    let value = match value {
        Value::Tag(COSE_SIGN1_TAG, inner) => *inner,
        other => other,
    };
    let Value::Array(items) = value else {
        return Err(CoseError::Malformed("COSE_Sign1"));
    };
    let [protected, _unprotected, payload, signature]: [Value; 4] = items
        .try_into()
        .map_err(|_| CoseError::Malformed("COSE_Sign1"))?;

    match (protected, payload, signature) {
        (Value::Bytes(protected), Value::Bytes(payload), Value::Bytes(signature)) => {
            Ok((protected, payload, signature))
        }
        _ => Err(CoseError::Malformed("COSE_Sign1")),
    }
}

/// Public key bytes of an OKP `COSE_Key`.
fn cose_key_bytes(value: Value) -> Result<[u8; 32], CoseError> {
    let Value::Map(entries) = value else {
        return Err(CoseError::Malformed("COSE_Key"));
    };
    let x_label = Integer::from(COSE_KEY_X);
    entries
        .into_iter()
        .find_map(|(label, value)| match (label, value) {
            (Value::Integer(label), Value::Bytes(bytes)) if label == x_label => Some(bytes),
            _ => None,
        })
        .ok_or(CoseError::Malformed("COSE_Key"))?
        .try_into()
        .map_err(|_| CoseError::InvalidKey)
}
