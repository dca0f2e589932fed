// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::extract::ApiJson;
use crate::{
    auth::Operation,
    error::{ApiError, ErrorBody},
    state::AppState,
    vault::AccessControl,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub document_id: String,
    /// Identity to grant to. Defaults to the application identity.
    #[serde(default)]
    pub grantee: Option<String>,
    #[serde(default = "default_read")]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub execute: bool,
}

fn default_read() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub document_id: String,
    /// Identity to revoke. Defaults to the application identity.
    #[serde(default)]
    pub grantee: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub message: String,
    pub document_id: String,
    pub grantee: String,
    /// Capabilities now held; empty after a revoke.
    pub capabilities: Vec<String>,
}

/// Resolve an optional grantee, falling back to the application identity.
fn grantee_or_app(state: &AppState, grantee: Option<String>) -> String {
    grantee
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| state.minter.issuer_did().to_string())
}

/// Reject blank document ids before minting anything.
fn require_document(document_id: &str) -> Result<(), ApiError> {
    if document_id.trim().is_empty() {
        return Err(ApiError::bad_request("documentId is required"));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/vault/permissions/grant",
    request_body = GrantRequest,
    tag = "Permissions",
    responses(
        (status = 200, body = PermissionResponse),
        (status = 400, body = ErrorBody),
        (status = 500, body = ErrorBody)
    )
)]
pub async fn grant_access(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GrantRequest>,
) -> Result<Json<PermissionResponse>, ApiError> {
    require_document(&request.document_id)?;
    let acl = AccessControl {
        grantee: grantee_or_app(&state, request.grantee),
        read: request.read,
        write: request.write,
        execute: request.execute,
    };

    let token = state.minter.mint(Operation::Update)?;
    state
        .vault
        .grant_access(&token, &request.document_id, &acl)
        .await
        .map_err(|e| ApiError::internal("Failed to grant access").with_details(e))?;

    info!(
        document = %request.document_id,
        grantee = %acl.grantee,
        capabilities = ?acl.capabilities(),
        "Access granted"
    );
    Ok(Json(PermissionResponse {
        message: "Access granted successfully".to_string(),
        capabilities: acl.capabilities(),
        document_id: request.document_id,
        grantee: acl.grantee,
    }))
}

#[utoipa::path(
    post,
    path = "/api/vault/permissions/revoke",
    request_body = RevokeRequest,
    tag = "Permissions",
    responses(
        (status = 200, body = PermissionResponse),
        (status = 400, body = ErrorBody),
        (status = 500, body = ErrorBody)
    )
)]
pub async fn revoke_access(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RevokeRequest>,
) -> Result<Json<PermissionResponse>, ApiError> {
    require_document(&request.document_id)?;
    let grantee = grantee_or_app(&state, request.grantee);

    let token = state.minter.mint(Operation::Update)?;
    state
        .vault
        .revoke_access(&token, &request.document_id, &grantee)
        .await
        .map_err(|e| ApiError::internal("Failed to revoke access").with_details(e))?;

    info!(document = %request.document_id, grantee = %grantee, "Access revoked");
    Ok(Json(PermissionResponse {
        message: "Access revoked successfully".to_string(),
        document_id: request.document_id,
        grantee,
        capabilities: Vec::new(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseDraft, ExpenseRecord};
    use axum::http::StatusCode;
    use chrono::Utc;

    async fn stored_record(state: &AppState) -> String {
        let record = ExpenseRecord::from_draft(
            ExpenseDraft {
                amount: 3.0,
                category: "books".into(),
                description: "paperback".into(),
                date: None,
            },
            Utc::now(),
        );
        let id = record.id.clone();
        state.memory_vault().insert(record).await;
        id
    }

    #[tokio::test]
    async fn grant_defaults_to_app_identity_with_read() {
        let state = AppState::in_memory();
        let id = stored_record(&state).await;

        let Json(response) = grant_access(
            State(state.clone()),
            ApiJson(GrantRequest {
                document_id: id.clone(),
                grantee: None,
                read: default_read(),
                write: false,
                execute: false,
            }),
        )
        .await
        .expect("grant succeeds");

        assert_eq!(response.grantee, state.minter.issuer_did());
        assert_eq!(response.capabilities, vec!["read"]);
        let acl = state.memory_vault().acl(&id).await.unwrap();
        assert_eq!(acl.len(), 1);
        assert_eq!(acl[0].grantee, state.minter.issuer_did());
    }

    #[tokio::test]
    async fn revoke_removes_named_grantee() {
        let state = AppState::in_memory();
        let id = stored_record(&state).await;

        grant_access(
            State(state.clone()),
            ApiJson(GrantRequest {
                document_id: id.clone(),
                grantee: Some("did:vault:auditor".into()),
                read: true,
                write: true,
                execute: false,
            }),
        )
        .await
        .expect("grant succeeds");

        let Json(response) = revoke_access(
            State(state.clone()),
            ApiJson(RevokeRequest {
                document_id: id.clone(),
                grantee: Some("did:vault:auditor".into()),
            }),
        )
        .await
        .expect("revoke succeeds");

        assert_eq!(response.grantee, "did:vault:auditor");
        assert!(state.memory_vault().acl(&id).await.unwrap().is_empty());
        assert_eq!(state.memory_vault().call_count(Operation::Update), 2);
    }

    #[tokio::test]
    async fn vault_failures_are_internal_errors() {
        let state = AppState::in_memory();

        let missing = grant_access(
            State(state.clone()),
            ApiJson(GrantRequest {
                document_id: "unknown".into(),
                grantee: None,
                read: true,
                write: false,
                execute: false,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(missing.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(missing.details.is_some());

        let blank = revoke_access(
            State(state.clone()),
            ApiJson(RevokeRequest {
                document_id: "  ".into(),
                grantee: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn grant_request_defaults_to_read_only() {
        let request: GrantRequest =
            serde_json::from_str(r#"{"documentId":"r1"}"#).expect("parses");
        assert!(request.read);
        assert!(!request.write);
        assert!(!request.execute);
        assert!(request.grantee.is_none());
    }
}
