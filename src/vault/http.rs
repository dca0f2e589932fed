// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! REST client for a vault node.
//!
//! | Call | Request |
//! |------|---------|
//! | create | `POST /v1/data/create` `{collection, data: [record], acl}` |
//! | read | `GET /v1/data/{collection}/{id}` -> `{data: record}` |
//! | update | `PUT /v1/data/{collection}/{id}` `{data: record}` |
//! | delete | `DELETE /v1/data/{collection}/{id}` |
//! | grant | `POST /v1/acl/grant` `{collection, document, acl}` |
//! | revoke | `POST /v1/acl/revoke` `{collection, document, grantee}` |
//!
//! Every request carries `Authorization: Bearer <delegation token>`.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{AccessControl, VaultError, VaultResult};
use crate::auth::DelegationToken;
use crate::models::ExpenseRecord;

#[derive(Debug, Clone)]
pub struct HttpVaultClient {
    base_url: Url,
    collection: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    data: ExpenseRecord,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    created: Vec<String>,
}

impl HttpVaultClient {
    pub fn new(base_url: &str, collection: impl Into<String>, timeout: Duration) -> VaultResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| VaultError::Config(format!("invalid vault URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VaultError::Config(format!(
                "vault URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(VaultError::Config("collection must not be empty".to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VaultError::Config(format!("failed to build HTTP client: {e}")))?;

        if parsed.cannot_be_a_base() {
            return Err(VaultError::Config(format!("vault URL '{base_url}' cannot be a base")));
        }

        Ok(Self {
            base_url: parsed,
            collection,
            http,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) async fn create_record(
        &self,
        token: &DelegationToken,
        record: &ExpenseRecord,
        acl: &AccessControl,
    ) -> VaultResult<String> {
        let payload = json!({
            "collection": self.collection,
            "data": [record],
            "acl": acl,
        });
        let response = self
            .send(
                self.http.post(self.url(&["v1", "data", "create"])).json(&payload),
                token,
                &record.id,
            )
            .await?;

        // Nodes answer either with the created ids or an empty body.
        let body = response
            .text()
            .await
            .map_err(|e| VaultError::InvalidResponse(format!("create response unreadable: {e}")))?;
        if body.trim().is_empty() {
            return Ok(record.id.clone());
        }
        let parsed: CreateResponse = serde_json::from_str(&body)
            .map_err(|e| VaultError::InvalidResponse(format!("create response invalid JSON: {e}")))?;
        Ok(parsed
            .created
            .into_iter()
            .next()
            .unwrap_or_else(|| record.id.clone()))
    }

    pub(crate) async fn read_record(
        &self,
        token: &DelegationToken,
        id: &str,
    ) -> VaultResult<ExpenseRecord> {
        let response = self
            .send(self.http.get(self.document_url(id)), token, id)
            .await?;
        let parsed: ReadResponse = response
            .json()
            .await
            .map_err(|e| VaultError::InvalidResponse(format!("read {id} invalid JSON: {e}")))?;
        Ok(parsed.data)
    }

    pub(crate) async fn update_record(
        &self,
        token: &DelegationToken,
        record: &ExpenseRecord,
    ) -> VaultResult<()> {
        self.send(
            self.http
                .put(self.document_url(&record.id))
                .json(&json!({ "data": record })),
            token,
            &record.id,
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn delete_record(&self, token: &DelegationToken, id: &str) -> VaultResult<()> {
        self.send(self.http.delete(self.document_url(id)), token, id)
            .await
            .map(|_| ())
    }

    pub(crate) async fn grant_access(
        &self,
        token: &DelegationToken,
        document_id: &str,
        acl: &AccessControl,
    ) -> VaultResult<()> {
        let payload = json!({
            "collection": self.collection,
            "document": document_id,
            "acl": acl,
        });
        self.send(
            self.http.post(self.url(&["v1", "acl", "grant"])).json(&payload),
            token,
            document_id,
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn revoke_access(
        &self,
        token: &DelegationToken,
        document_id: &str,
        grantee: &str,
    ) -> VaultResult<()> {
        let payload = json!({
            "collection": self.collection,
            "document": document_id,
            "grantee": grantee,
        });
        self.send(
            self.http.post(self.url(&["v1", "acl", "revoke"])).json(&payload),
            token,
            document_id,
        )
        .await
        .map(|_| ())
    }

    /// Append percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // The constructor rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn document_url(&self, id: &str) -> Url {
        self.url(&["v1", "data", &self.collection, id])
    }

    async fn send(
        &self,
        request: RequestBuilder,
        token: &DelegationToken,
        subject: &str,
    ) -> VaultResult<Response> {
        let response = request
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(
            status = %status,
            subject = %subject,
            cmd = %token.claims().cmd,
            "Vault responded"
        );
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, body, subject))
    }
}

/// Map a non-success vault status to an error.
fn map_status(status: StatusCode, body: String, subject: &str) -> VaultError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let reason = if body.trim().is_empty() {
                format!("{status} for {subject}")
            } else {
                body
            };
            VaultError::PermissionDenied(reason)
        }
        StatusCode::NOT_FOUND => VaultError::NotFound(subject.to_string()),
        _ => VaultError::Rejected {
            status: status.as_u16(),
            body,
        },
    }
}
