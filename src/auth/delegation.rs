// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operation-scoped delegation tokens.
//!
//! Every vault call carries a token minted for exactly one operation on one
//! record. Tokens are compact three-segment strings:
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(r || s)
//! ```
//!
//! - header: `{"alg":"ES256K","typ":"delegation"}`
//! - claims: issuer (application DID), audience and subject (acting user),
//!   command, `iat`, `exp = iat + 3600`, random `jti`
//! - signature: ECDSA/secp256k1 over SHA-256 of `header.claims`, signed with
//!   the application's long-lived key

use std::fmt;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{keys, DelegationError};

/// Token lifetime: exactly one hour after issuance.
pub const TOKEN_TTL_SECS: i64 = 3600;

const TOKEN_ALGORITHM: &str = "ES256K";
const TOKEN_TYPE: &str = "delegation";

/// Vault operation a token is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Command string carried in the token's `cmd` claim.
    pub fn command(&self) -> &'static str {
        match self {
            Operation::Create => "/vault/data/create",
            Operation::Read => "/vault/data/read",
            Operation::Update => "/vault/data/update",
            Operation::Delete => "/vault/data/delete",
        }
    }

    pub fn from_command(command: &str) -> Option<Operation> {
        match command {
            "/vault/data/create" => Some(Operation::Create),
            "/vault/data/read" => Some(Operation::Read),
            "/vault/data/update" => Some(Operation::Update),
            "/vault/data/delete" => Some(Operation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims carried by a delegation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationClaims {
    /// Issuer (application DID)
    pub iss: String,
    /// Audience (acting user identity)
    pub aud: String,
    /// Subject (acting user identity)
    pub sub: String,
    /// Command the token authorizes
    pub cmd: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl DelegationClaims {
    pub fn operation(&self) -> Option<Operation> {
        Operation::from_command(&self.cmd)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// A minted token together with its decoded claims.
#[derive(Debug, Clone)]
pub struct DelegationToken {
    compact: String,
    claims: DelegationClaims,
}

impl DelegationToken {
    /// Compact form sent as `Authorization: Bearer <token>`.
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    pub fn claims(&self) -> &DelegationClaims {
        &self.claims
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.claims.exp, 0)
    }
}

/// Mints delegation tokens with the application's long-lived key.
pub struct DelegationMinter {
    signing_key: SigningKey,
    issuer: String,
    audience: String,
}

impl fmt::Debug for DelegationMinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the key.
        f.debug_struct("DelegationMinter")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl DelegationMinter {
    /// Create a minter acting on behalf of `user_did`.
    pub fn new(signing_key: SigningKey, user_did: impl Into<String>) -> Result<Self, DelegationError> {
        let audience = user_did.into().trim().to_string();
        if audience.is_empty() || !audience.starts_with("did:") {
            return Err(DelegationError::InvalidIdentity(format!(
                "expected a DID, got '{audience}'"
            )));
        }

        let issuer = keys::did_for_key(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            issuer,
            audience,
        })
    }

    /// Create a minter from hex or PEM key material.
    pub fn from_key_material(material: &str, user_did: &str) -> Result<Self, DelegationError> {
        let signing_key = keys::signing_key_from_material(material)?;
        Self::new(signing_key, user_did)
    }

    /// The application's own identity (token issuer, default ACL grantee).
    pub fn issuer_did(&self) -> &str {
        &self.issuer
    }

    /// The acting user identity tokens are addressed to.
    pub fn user_did(&self) -> &str {
        &self.audience
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Mint a fresh token for one operation.
    pub fn mint(&self, operation: Operation) -> Result<DelegationToken, DelegationError> {
        self.mint_at(operation, Utc::now())
    }

    /// Mint with an explicit issuance time.
    pub fn mint_at(
        &self,
        operation: Operation,
        issued_at: DateTime<Utc>,
    ) -> Result<DelegationToken, DelegationError> {
        let iat = issued_at.timestamp();
        let claims = DelegationClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: self.audience.clone(),
            cmd: operation.command().to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
        };

        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        };

        let header_b64 = encode_segment(&header)?;
        let claims_b64 = encode_segment(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature.to_bytes());

        Ok(DelegationToken {
            compact: format!("{signing_input}.{signature_b64}"),
            claims,
        })
    }

    /// Verify a compact token against this minter's key.
    pub fn verify(&self, compact: &str) -> Result<DelegationClaims, DelegationError> {
        verify_token(compact, self.verifying_key(), Utc::now())
    }
}

/// Verify signature, header and expiry of a compact token.
pub fn verify_token(
    compact: &str,
    key: &VerifyingKey,
    now: DateTime<Utc>,
) -> Result<DelegationClaims, DelegationError> {
    let mut segments = compact.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DelegationError::MalformedToken);
    };

    let header: TokenHeader = decode_segment(header_b64)?;
    if header.alg != TOKEN_ALGORITHM || header.typ != TOKEN_TYPE {
        return Err(DelegationError::MalformedToken);
    }

    let signature_bytes = Base64UrlUnpadded::decode_vec(signature_b64)
        .map_err(|_| DelegationError::MalformedToken)?;
    let signature =
        Signature::from_slice(&signature_bytes).map_err(|_| DelegationError::MalformedToken)?;

    let signing_input = format!("{header_b64}.{claims_b64}");
    key.verify(signing_input.as_bytes(), &signature)
        .map_err(|_| DelegationError::InvalidSignature)?;

    let claims: DelegationClaims = decode_segment(claims_b64)?;
    if claims.is_expired_at(now) {
        return Err(DelegationError::TokenExpired);
    }

    Ok(claims)
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, DelegationError> {
    let json = serde_json::to_vec(value).map_err(|e| DelegationError::Encoding(e.to_string()))?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, DelegationError> {
    let bytes =
        Base64UrlUnpadded::decode_vec(segment).map_err(|_| DelegationError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| DelegationError::MalformedToken)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::Duration;

    pub(crate) const TEST_USER_DID: &str = "did:vault:user-under-test";

    pub(crate) fn test_minter() -> DelegationMinter {
        let key = SigningKey::from_slice(&[7u8; 32]).unwrap();
        DelegationMinter::new(key, TEST_USER_DID).unwrap()
    }

    #[test]
    fn token_expires_exactly_one_hour_after_issuance() {
        let minter = test_minter();
        let token = minter.mint(Operation::Create).unwrap();

        let claims = token.claims();
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(
            token.expires_at().unwrap().timestamp(),
            claims.iat + TOKEN_TTL_SECS
        );
    }

    #[test]
    fn token_is_scoped_and_addressed() {
        let minter = test_minter();
        let token = minter.mint(Operation::Delete).unwrap();

        let claims = minter.verify(token.as_str()).unwrap();
        assert_eq!(claims.cmd, "/vault/data/delete");
        assert_eq!(claims.operation(), Some(Operation::Delete));
        assert_eq!(claims.aud, TEST_USER_DID);
        assert_eq!(claims.sub, TEST_USER_DID);
        assert_eq!(claims.iss, minter.issuer_did());
    }

    #[test]
    fn header_segment_names_algorithm() {
        let token = test_minter().mint(Operation::Read).unwrap();
        let header_b64 = token.as_str().split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).unwrap()).unwrap();
        assert_eq!(header["alg"], "ES256K");
        assert_eq!(header["typ"], "delegation");
    }

    #[test]
    fn each_mint_has_a_fresh_token_id() {
        let minter = test_minter();
        let first = minter.mint(Operation::Create).unwrap();
        let second = minter.mint(Operation::Create).unwrap();
        assert_ne!(first.claims().jti, second.claims().jti);
        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn tampered_claims_fail_verification() {
        let minter = test_minter();
        let token = minter.mint(Operation::Read).unwrap();
        let mut parts: Vec<&str> = token.as_str().split('.').collect();

        let mut forged = token.claims().clone();
        forged.cmd = Operation::Delete.command().to_string();
        let forged_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        parts[1] = &forged_b64;

        let result = minter.verify(&parts.join("."));
        assert!(matches!(result, Err(DelegationError::InvalidSignature)));
    }

    #[test]
    fn token_from_another_key_fails_verification() {
        let other = DelegationMinter::new(SigningKey::from_slice(&[9u8; 32]).unwrap(), TEST_USER_DID)
            .unwrap();
        let token = other.mint(Operation::Read).unwrap();
        assert!(matches!(
            test_minter().verify(token.as_str()),
            Err(DelegationError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let minter = test_minter();
        let issued = Utc::now() - Duration::hours(2);
        let token = minter.mint_at(Operation::Read, issued).unwrap();

        let result = verify_token(token.as_str(), minter.verifying_key(), Utc::now());
        assert!(matches!(result, Err(DelegationError::TokenExpired)));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let minter = test_minter();
        for bad in ["", "a.b", "a.b.c.d", "!!!.???.###"] {
            assert!(
                matches!(minter.verify(bad), Err(DelegationError::MalformedToken)),
                "expected malformed for {bad:?}"
            );
        }
    }

    #[test]
    fn user_identity_must_be_a_did() {
        let key = SigningKey::from_slice(&[7u8; 32]).unwrap();
        let result = DelegationMinter::new(key, "alice");
        assert!(matches!(result, Err(DelegationError::InvalidIdentity(_))));
    }

    #[test]
    fn debug_output_hides_key() {
        let rendered = format!("{:?}", test_minter());
        assert!(rendered.contains("issuer"));
        assert!(!rendered.contains("signing_key"));
    }
}
