// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Delegation errors.

/// Errors raised while loading the application key or minting and
/// verifying delegation tokens.
#[derive(Debug, thiserror::Error)]
pub enum DelegationError {
    /// Application key could not be parsed
    #[error("Invalid application key: {0}")]
    InvalidKey(String),
    /// Acting user identity is empty or malformed
    #[error("Invalid user identity: {0}")]
    InvalidIdentity(String),
    /// Token claims could not be encoded
    #[error("Failed to encode delegation token: {0}")]
    Encoding(String),
    /// Token does not have three base64url segments or bad claims
    #[error("Delegation token is malformed")]
    MalformedToken,
    /// Token signature does not match the application key
    #[error("Delegation token signature is invalid")]
    InvalidSignature,
    /// Token has expired
    #[error("Delegation token has expired")]
    TokenExpired,
}

impl DelegationError {
    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            DelegationError::InvalidKey(_) => "invalid_key",
            DelegationError::InvalidIdentity(_) => "invalid_identity",
            DelegationError::Encoding(_) => "encoding_error",
            DelegationError::MalformedToken => "malformed_token",
            DelegationError::InvalidSignature => "invalid_signature",
            DelegationError::TokenExpired => "token_expired",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = DelegationError::InvalidKey("not hex".into());
        assert_eq!(err.to_string(), "Invalid application key: not hex");
        assert_eq!(err.error_code(), "invalid_key");
    }

    #[test]
    fn token_errors_have_distinct_codes() {
        assert_eq!(DelegationError::TokenExpired.error_code(), "token_expired");
        assert_eq!(
            DelegationError::InvalidSignature.error_code(),
            "invalid_signature"
        );
        assert_eq!(DelegationError::MalformedToken.error_code(), "malformed_token");
    }
}
