// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application signing key loading.
//!
//! The long-lived application key is a secp256k1 private key supplied either
//! as 64 hex characters (optionally `0x`-prefixed) or as a PEM document
//! (SEC1 `EC PRIVATE KEY` or PKCS#8 `PRIVATE KEY`).

use k256::{
    ecdsa::{SigningKey, VerifyingKey},
    SecretKey,
};

use super::DelegationError;

/// DID method used for identities derived from application keys.
pub const DID_METHOD_PREFIX: &str = "did:vault:";

/// Parse the application key from configuration material.
pub fn signing_key_from_material(material: &str) -> Result<SigningKey, DelegationError> {
    let material = material.trim();
    if material.starts_with("-----BEGIN") {
        signing_key_from_pem(material.as_bytes())
    } else {
        signing_key_from_hex(material)
    }
}

/// Parse a hex-encoded 32-byte secret scalar.
pub fn signing_key_from_hex(hex_key: &str) -> Result<SigningKey, DelegationError> {
    let hex_key = hex_key.strip_prefix("0x").unwrap_or(hex_key);
    let bytes = hex::decode(hex_key)
        .map_err(|e| DelegationError::InvalidKey(format!("Invalid hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(DelegationError::InvalidKey(format!(
            "Expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes)
        .map_err(|e| DelegationError::InvalidKey(format!("Invalid scalar: {e}")))
}

/// Parse a PEM-encoded private key.
pub fn signing_key_from_pem(pem_bytes: &[u8]) -> Result<SigningKey, DelegationError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| DelegationError::InvalidKey(format!("Invalid UTF-8: {e}")))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| DelegationError::InvalidKey(format!("Invalid PEM: {e}")))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
        .map_err(|e| DelegationError::InvalidKey(format!("Invalid key format: {e}")))?;

    Ok(SigningKey::from(secret_key))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

/// `did:vault:<hex compressed public key>` for a verifying key.
pub fn did_for_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(true);
    format!("{DID_METHOD_PREFIX}{}", hex::encode(point.as_bytes()))
}
