// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Expense record endpoints.
//!
//! Every vault call is authorized by a token minted for that single call, so
//! bulk requests mint one token per record. Successful creates are appended
//! to the identifier ledger; deletes and removals take ids out of it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::extract::ApiJson;
use crate::{
    auth::Operation,
    error::{ApiError, ErrorBody},
    models::{ExpenseDraft, ExpensePatch, ExpenseRecord},
    state::AppState,
    validation::{validate_batch, validate_ids, validate_patch, validate_patch_batch},
    vault::VaultError,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub message: String,
    /// Records as written, including generated ids and timestamps.
    pub data_written: Vec<ExpenseRecord>,
    pub created_ids: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadAllResponse {
    pub total_records: usize,
    pub data: Vec<ExpenseRecord>,
    /// Tracked records that could not be fetched and were untracked.
    pub failed_count: usize,
    pub note: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordResponse {
    pub data: ExpenseRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateResponse {
    pub message: String,
    pub data: ExpenseRecord,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResponse {
    pub message: String,
    pub updated_ids: Vec<String>,
}

/// One entry of a bulk update body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkUpdateItem {
    /// Record identifier (`_id` is accepted as well).
    pub id: String,
    #[serde(flatten)]
    pub patch: ExpensePatch,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkUpdateRequest {
    pub updates: Vec<BulkUpdateItem>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: String,
    pub deleted_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FailedDeletion {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub message: String,
    pub deleted_ids: Vec<String>,
    pub failed: Vec<FailedDeletion>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResponse {
    pub message: String,
    pub removed_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkRemoveResponse {
    pub message: String,
    pub removed_count: usize,
}

/// A list of record identifiers.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IdsRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Map a vault failure, attaching the grant the application is missing when
/// the vault denied the call.
fn vault_failure(state: &AppState, error: VaultError, capabilities: &[&str]) -> ApiError {
    let denied = matches!(error, VaultError::PermissionDenied(_));
    let api_error = ApiError::from(error);
    if denied {
        api_error.with_required_permissions(state.required_permissions(capabilities))
    } else {
        api_error
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[utoipa::path(
    post,
    path = "/api/vault/write",
    request_body(
        content = Vec<ExpenseDraft>,
        description = "A single expense object or an array of them"
    ),
    tag = "Vault",
    responses(
        (status = 201, body = WriteResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Vault denied the write", body = ErrorBody),
        (status = 500, body = ErrorBody)
    )
)]
pub async fn write_records(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<WriteResponse>), ApiError> {
    // The whole batch is validated before anything is written.
    let drafts = validate_batch(&body)?;
    let now = Utc::now();
    let acl = state.record_acl();

    let mut data_written = Vec::with_capacity(drafts.len());
    let mut created_ids = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let mut record = ExpenseRecord::from_draft(draft, now);
        let token = state.minter.mint(Operation::Create)?;

        let id = match state.vault.create_record(&token, &record, &acl).await {
            Ok(id) => id,
            Err(e) => {
                let mut error = vault_failure(&state, e, &["write"]);
                if !created_ids.is_empty() {
                    warn!(
                        written = created_ids.len(),
                        "Bulk write failed part way, earlier records stay written"
                    );
                    let written = created_ids.len();
                    error.details = Some(format!(
                        "{}; {written} record{} written before the failure",
                        error.details.unwrap_or_default(),
                        plural(written)
                    ));
                }
                return Err(error);
            }
        };

        state.ledger.append(id.clone()).await?;
        record.id = id.clone();
        created_ids.push(id);
        data_written.push(record);
    }

    info!(count = created_ids.len(), "Records written to vault");
    let count = created_ids.len();
    Ok((
        StatusCode::CREATED,
        Json(WriteResponse {
            message: format!("Successfully wrote {count} record{} to the vault", plural(count)),
            data_written,
            created_ids,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/vault/read",
    tag = "Vault",
    responses(
        (status = 200, description = "Every tracked record that still resolves", body = ReadAllResponse),
        (status = 500, body = ErrorBody)
    )
)]
pub async fn read_all(State(state): State<AppState>) -> Result<Json<ReadAllResponse>, ApiError> {
    let minter = &state.minter;
    let vault = &state.vault;

    let reconciliation = state
        .ledger
        .reconcile_against(|id| async move {
            let token = minter.mint(Operation::Read)?;
            let record = vault.read_record(&token, &id).await?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(record)
        })
        .await?;

    let failed_count = reconciliation.failed_count();
    let data = reconciliation.into_payloads();
    let note = if failed_count == 0 {
        "All tracked records were retrieved".to_string()
    } else {
        format!(
            "{failed_count} tracked record{} could not be retrieved and {} removed from the ledger",
            plural(failed_count),
            if failed_count == 1 { "was" } else { "were" }
        )
    };

    Ok(Json(ReadAllResponse {
        total_records: data.len(),
        data,
        failed_count,
        note,
    }))
}

#[utoipa::path(
    get,
    path = "/api/vault/read/{id}",
    params(("id" = String, Path, description = "Record identifier")),
    tag = "Vault",
    responses(
        (status = 200, body = RecordResponse),
        (status = 403, description = "Vault denied the read", body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn read_one(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RecordResponse>, ApiError> {
    let token = state.minter.mint(Operation::Read)?;
    match state.vault.read_record(&token, &id).await {
        Ok(data) => Ok(Json(RecordResponse { data })),
        Err(e @ VaultError::PermissionDenied(_)) => Err(vault_failure(&state, e, &["read"])),
        Err(e) => Err(ApiError::not_found("Record not found").with_details(e)),
    }
}

/// Fetch a record, apply `patch` and write it back.
async fn apply_update(
    state: &AppState,
    id: &str,
    patch: ExpensePatch,
    now: DateTime<Utc>,
) -> Result<ExpenseRecord, ApiError> {
    let token = state.minter.mint(Operation::Read)?;
    let mut record = state
        .vault
        .read_record(&token, id)
        .await
        .map_err(|e| vault_failure(state, e, &["read"]))?;

    patch.apply(&mut record, now);

    let token = state.minter.mint(Operation::Update)?;
    state
        .vault
        .update_record(&token, &record)
        .await
        .map_err(|e| vault_failure(state, e, &["write"]))?;
    Ok(record)
}

#[utoipa::path(
    put,
    path = "/api/vault/update/{id}",
    params(("id" = String, Path, description = "Record identifier")),
    request_body = ExpensePatch,
    tag = "Vault",
    responses(
        (status = 200, body = UpdateResponse),
        (status = 400, body = ErrorBody),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 500, body = ErrorBody)
    )
)]
pub async fn update_one(
    Path(id): Path<String>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let patch = validate_patch(&body)?;
    let data = apply_update(&state, &id, patch, Utc::now()).await?;

    info!(id = %id, "Record updated");
    Ok(Json(UpdateResponse {
        message: "Record updated successfully".to_string(),
        data,
    }))
}

#[utoipa::path(
    post,
    path = "/api/vault/update",
    request_body = BulkUpdateRequest,
    tag = "Vault",
    responses(
        (status = 200, body = BulkUpdateResponse),
        (status = 400, body = ErrorBody),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 500, body = ErrorBody)
    )
)]
pub async fn update_bulk(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let updates = validate_patch_batch(&body)?;
    let now = Utc::now();

    let mut updated_ids = Vec::with_capacity(updates.len());
    for (id, patch) in updates {
        apply_update(&state, &id, patch, now).await?;
        updated_ids.push(id);
    }

    info!(count = updated_ids.len(), "Records updated");
    let count = updated_ids.len();
    Ok(Json(BulkUpdateResponse {
        message: format!("Successfully updated {count} record{}", plural(count)),
        updated_ids,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/vault/delete/{id}",
    params(("id" = String, Path, description = "Record identifier")),
    tag = "Vault",
    responses(
        (status = 200, body = DeleteResponse),
        (status = 403, body = ErrorBody),
        (status = 404, description = "Record missing from the vault; it is untracked", body = ErrorBody),
        (status = 500, body = ErrorBody)
    )
)]
pub async fn delete_one(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let token = state.minter.mint(Operation::Delete)?;
    match state.vault.delete_record(&token, &id).await {
        Ok(()) => {}
        Err(e @ VaultError::NotFound(_)) => {
            state.ledger.remove(&id).await?;
            warn!(id = %id, "Record already gone from vault, untracked");
            return Err(ApiError::from(e));
        }
        Err(e) => return Err(vault_failure(&state, e, &["write"])),
    }

    state.ledger.remove(&id).await?;
    info!(id = %id, "Record deleted");
    Ok(Json(DeleteResponse {
        message: "Record deleted successfully".to_string(),
        deleted_id: id,
    }))
}

#[utoipa::path(
    post,
    path = "/api/vault/delete",
    request_body = IdsRequest,
    tag = "Vault",
    responses(
        (status = 200, description = "Per-id outcome; missing records are untracked", body = BulkDeleteResponse),
        (status = 400, body = ErrorBody),
        (status = 500, body = ErrorBody)
    )
)]
pub async fn delete_bulk(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    validate_ids(&request.ids)?;

    let mut deleted_ids = Vec::new();
    let mut untrack = Vec::new();
    let mut failed = Vec::new();
    for id in request.ids {
        let token = state.minter.mint(Operation::Delete)?;
        match state.vault.delete_record(&token, &id).await {
            Ok(()) => {
                untrack.push(id.clone());
                deleted_ids.push(id);
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Bulk delete entry failed");
                if matches!(e, VaultError::NotFound(_)) {
                    untrack.push(id.clone());
                }
                failed.push(FailedDeletion {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    if !untrack.is_empty() {
        state.ledger.remove_many(&untrack).await?;
    }

    let count = deleted_ids.len();
    Ok(Json(BulkDeleteResponse {
        message: format!("Deleted {count} record{}, {} failed", plural(count), failed.len()),
        deleted_ids,
        failed,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/vault/remove/{id}",
    params(("id" = String, Path, description = "Record identifier")),
    tag = "Vault",
    responses(
        (status = 200, description = "Untracked; the vault record is left in place", body = RemoveResponse),
        (status = 404, description = "Id is not tracked", body = ErrorBody)
    )
)]
pub async fn remove_one(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RemoveResponse>, ApiError> {
    if !state.ledger.remove(&id).await? {
        return Err(ApiError::not_found("Record is not tracked"));
    }

    info!(id = %id, "Record untracked");
    Ok(Json(RemoveResponse {
        message: "Record removed from the ledger".to_string(),
        removed_id: id,
    }))
}

#[utoipa::path(
    post,
    path = "/api/vault/remove-bulk",
    request_body = IdsRequest,
    tag = "Vault",
    responses(
        (status = 200, body = BulkRemoveResponse),
        (status = 400, body = ErrorBody)
    )
)]
pub async fn remove_bulk(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> Result<Json<BulkRemoveResponse>, ApiError> {
    validate_ids(&request.ids)?;
    let removed_count = state.ledger.remove_many(&request.ids).await?;

    Ok(Json(BulkRemoveResponse {
        message: format!(
            "Removed {removed_count} record{} from the ledger",
            plural(removed_count)
        ),
        removed_count,
    }))
}
