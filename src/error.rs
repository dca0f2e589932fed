// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::DelegationError;
use crate::storage::LedgerError;
use crate::validation::ValidationError;
use crate::vault::VaultError;

/// Access the application identity needs, returned with 403 responses.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequiredPermissions {
    /// Collection the operation targets.
    pub collection: String,
    /// Identity that must be granted access.
    pub grantee: String,
    /// Capabilities the grantee needs.
    pub capabilities: Vec<String>,
    /// How to fix it.
    pub hint: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
    pub required_permissions: Option<RequiredPermissions>,
}

/// JSON error body.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_permissions: Option<RequiredPermissions>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            required_permissions: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attach the underlying cause.
    pub fn with_details(mut self, details: impl ToString) -> Self {
        self.details = Some(details.to_string());
        self
    }

    pub fn with_required_permissions(mut self, required: RequiredPermissions) -> Self {
        self.required_permissions = Some(required);
        self
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("Invalid JSON body").with_details(rejection.body_text())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::internal("Failed to persist record ledger").with_details(e)
    }
}

impl From<DelegationError> for ApiError {
    fn from(e: DelegationError) -> Self {
        ApiError::internal("Failed to mint delegation token").with_details(e)
    }
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::PermissionDenied(_) => ApiError::forbidden("Permission denied"),
            VaultError::NotFound(_) => ApiError::not_found("Record not found"),
            _ => ApiError::internal("Vault request failed"),
        }
        .with_details(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                error = %self.message,
                details = ?self.details,
                "Request failed"
            );
        }

        let body = Json(ErrorBody {
            error: self.message,
            details: self.details,
            required_permissions: self.required_permissions,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let denied = ApiError::forbidden("nope");
        assert_eq!(denied.status, StatusCode::FORBIDDEN);

        let internal = ApiError::internal("oops").with_details("disk full");
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.details.as_deref(), Some("disk full"));
    }

    #[test]
    fn vault_errors_map_to_statuses() {
        let denied = ApiError::from(VaultError::PermissionDenied("no write".into()));
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        assert_eq!(denied.details.as_deref(), Some("Vault denied access: no write"));

        let missing = ApiError::from(VaultError::NotFound("r1".into()));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let other = ApiError::from(VaultError::Transport("timeout".into()));
        assert_eq!(other.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err = ApiError::from(ValidationError::Amount);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Amount must be a non-negative number");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[tokio::test]
    async fn forbidden_response_carries_required_permissions() {
        let response = ApiError::forbidden("Permission denied")
            .with_details("denied")
            .with_required_permissions(RequiredPermissions {
                collection: "expenses".into(),
                grantee: "did:vault:app".into(),
                capabilities: vec!["write".into()],
                hint: "grant write".into(),
            })
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Permission denied");
        assert_eq!(body["details"], "denied");
        assert_eq!(body["requiredPermissions"]["collection"], "expenses");
        assert_eq!(body["requiredPermissions"]["capabilities"][0], "write");
    }
}
