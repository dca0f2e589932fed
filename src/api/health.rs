// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Number of record ids in the ledger.
    pub tracked_records: usize,
}

/// Liveness check. Does not call the vault.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("Expense vault server is running ({} vault)", state.vault.kind()),
        tracked_records: state.ledger.len().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_tracked_records() {
        let state = AppState::in_memory();
        state.ledger.append("r1").await.unwrap();

        let Json(response) = health(State(state.clone())).await;

        assert_eq!(response.status, "ok");
        assert_eq!(response.tracked_records, 1);
        assert!(state.memory_vault().calls().is_empty());
    }
}
