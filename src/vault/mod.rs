// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Backend
//!
//! The encrypted record vault is an external service. This module defines
//! the small surface the service needs from it and two implementations:
//!
//! | Variant | Use Case |
//! |---------|----------|
//! | [`VaultBackend::Http`] | Production: REST calls to a vault node |
//! | [`VaultBackend::Memory`] | Tests and local development |
//!
//! Every call takes a [`DelegationToken`] minted for that single operation.

pub mod http;
pub mod memory;

use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::DelegationToken;
use crate::models::ExpenseRecord;

pub use http::HttpVaultClient;
pub use memory::InMemoryVault;

/// Capabilities granted to a grantee on one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccessControl {
    /// Identity (DID) receiving the capabilities.
    pub grantee: String,
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl AccessControl {
    /// Capability names that are granted, e.g. `["read", "write"]`.
    pub fn capabilities(&self) -> Vec<String> {
        [
            ("read", self.read),
            ("write", self.write),
            ("execute", self.execute),
        ]
        .into_iter()
        .filter(|(_, granted)| *granted)
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Vault configuration invalid: {0}")]
    Config(String),

    #[error("Vault denied access: {0}")]
    PermissionDenied(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Vault rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Vault request failed: {0}")]
    Transport(String),

    #[error("Vault response was invalid: {0}")]
    InvalidResponse(String),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Runtime-selected vault implementation.
#[derive(Debug)]
pub enum VaultBackend {
    Http(HttpVaultClient),
    Memory(InMemoryVault),
}

impl VaultBackend {
    /// In-memory vault using the given collection name, accepting tokens
    /// signed by `verifying_key`.
    pub fn memory(collection: impl Into<String>, verifying_key: VerifyingKey) -> Self {
        Self::Memory(InMemoryVault::new(collection, verifying_key))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Memory(_) => "memory",
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            Self::Http(client) => client.collection(),
            Self::Memory(vault) => vault.collection(),
        }
    }

    pub fn as_memory(&self) -> Option<&InMemoryVault> {
        match self {
            Self::Memory(vault) => Some(vault),
            Self::Http(_) => None,
        }
    }

    /// Store a new record with an initial access-control entry.
    /// Returns the identifier the vault stored it under.
    pub async fn create_record(
        &self,
        token: &DelegationToken,
        record: &ExpenseRecord,
        acl: &AccessControl,
    ) -> VaultResult<String> {
        match self {
            Self::Http(client) => client.create_record(token, record, acl).await,
            Self::Memory(vault) => vault.create_record(token, record, acl).await,
        }
    }

    pub async fn read_record(&self, token: &DelegationToken, id: &str) -> VaultResult<ExpenseRecord> {
        match self {
            Self::Http(client) => client.read_record(token, id).await,
            Self::Memory(vault) => vault.read_record(token, id).await,
        }
    }

    pub async fn update_record(
        &self,
        token: &DelegationToken,
        record: &ExpenseRecord,
    ) -> VaultResult<()> {
        match self {
            Self::Http(client) => client.update_record(token, record).await,
            Self::Memory(vault) => vault.update_record(token, record).await,
        }
    }

    pub async fn delete_record(&self, token: &DelegationToken, id: &str) -> VaultResult<()> {
        match self {
            Self::Http(client) => client.delete_record(token, id).await,
            Self::Memory(vault) => vault.delete_record(token, id).await,
        }
    }

    pub async fn grant_access(
        &self,
        token: &DelegationToken,
        document_id: &str,
        acl: &AccessControl,
    ) -> VaultResult<()> {
        match self {
            Self::Http(client) => client.grant_access(token, document_id, acl).await,
            Self::Memory(vault) => vault.grant_access(token, document_id, acl).await,
        }
    }

    pub async fn revoke_access(
        &self,
        token: &DelegationToken,
        document_id: &str,
        grantee: &str,
    ) -> VaultResult<()> {
        match self {
            Self::Http(client) => client.revoke_access(token, document_id, grantee).await,
            Self::Memory(vault) => vault.revoke_access(token, document_id, grantee).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_lists_granted_flags_only() {
        let acl = AccessControl {
            grantee: "did:vault:app".into(),
            read: true,
            write: false,
            execute: true,
        };
        assert_eq!(acl.capabilities(), vec!["read", "execute"]);
    }

    #[test]
    fn memory_backend_reports_kind_and_collection() {
        let minter = crate::auth::delegation::tests::test_minter();
        let backend = VaultBackend::memory("expenses", minter.verifying_key().clone());
        assert_eq!(backend.kind(), "memory");
        assert_eq!(backend.collection(), "expenses");
        assert!(backend.as_memory().is_some());
    }
}
