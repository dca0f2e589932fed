// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::{ErrorBody, RequiredPermissions},
    models::{ExpenseDraft, ExpensePatch, ExpenseRecord},
    state::AppState,
    vault::AccessControl,
};

pub mod extract;
pub mod health;
pub mod permissions;
pub mod vault;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let vault_routes = Router::new()
        .route("/write", post(vault::write_records))
        .route("/read", get(vault::read_all))
        .route("/read/{id}", get(vault::read_one))
        .route("/update", post(vault::update_bulk))
        .route("/update/{id}", put(vault::update_one))
        .route("/delete", post(vault::delete_bulk))
        .route("/delete/{id}", delete(vault::delete_one))
        .route("/remove/{id}", delete(vault::remove_one))
        .route("/remove-bulk", post(vault::remove_bulk))
        .route("/permissions/grant", post(permissions::grant_access))
        .route("/permissions/revoke", post(permissions::revoke_access));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/vault", vault_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CorsLayer::permissive()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        vault::write_records,
        vault::read_all,
        vault::read_one,
        vault::update_one,
        vault::update_bulk,
        vault::delete_one,
        vault::delete_bulk,
        vault::remove_one,
        vault::remove_bulk,
        permissions::grant_access,
        permissions::revoke_access
    ),
    components(
        schemas(
            ExpenseRecord,
            ExpenseDraft,
            ExpensePatch,
            AccessControl,
            ErrorBody,
            RequiredPermissions,
            health::HealthResponse,
            vault::WriteResponse,
            vault::ReadAllResponse,
            vault::RecordResponse,
            vault::UpdateResponse,
            vault::BulkUpdateItem,
            vault::BulkUpdateRequest,
            vault::BulkUpdateResponse,
            vault::DeleteResponse,
            vault::FailedDeletion,
            vault::BulkDeleteResponse,
            vault::RemoveResponse,
            vault::BulkRemoveResponse,
            vault::IdsRequest,
            permissions::GrantRequest,
            permissions::RevokeRequest,
            permissions::PermissionResponse
        )
    ),
    tags(
        (name = "Health", description = "Service liveness"),
        (name = "Vault", description = "Expense records stored in the vault"),
        (name = "Permissions", description = "Record access control")
    )
)]
pub struct ApiDoc;
