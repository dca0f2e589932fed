// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::DelegationMinter;
use crate::error::RequiredPermissions;
use crate::storage::IdentifierLedger;
use crate::vault::{AccessControl, VaultBackend};

#[derive(Clone)]
pub struct AppState {
    /// Identifiers of records this service has created.
    pub ledger: Arc<IdentifierLedger>,
    pub vault: Arc<VaultBackend>,
    /// Mints one operation-scoped token per vault call.
    pub minter: Arc<DelegationMinter>,
}

impl AppState {
    pub fn new(ledger: IdentifierLedger, vault: VaultBackend, minter: DelegationMinter) -> Self {
        Self {
            ledger: Arc::new(ledger),
            vault: Arc::new(vault),
            minter: Arc::new(minter),
        }
    }

    /// Access the application keeps on records it creates.
    pub fn record_acl(&self) -> AccessControl {
        AccessControl {
            grantee: self.minter.issuer_did().to_string(),
            read: true,
            write: true,
            execute: false,
        }
    }

    /// Describe what must be granted to the application for a denied call.
    pub fn required_permissions(&self, capabilities: &[&str]) -> RequiredPermissions {
        let collection = self.vault.collection().to_string();
        let grantee = self.minter.issuer_did().to_string();
        let hint = format!(
            "Grant {} on collection '{collection}' to {grantee}, then retry",
            capabilities.join(" and ")
        );
        RequiredPermissions {
            collection,
            grantee,
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            hint,
        }
    }

    /// State backed by an in-memory vault and ledger store.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::with_ledger(IdentifierLedger::in_memory())
    }

    /// In-memory state around a caller-supplied ledger.
    #[cfg(test)]
    pub fn with_ledger(ledger: IdentifierLedger) -> Self {
        use crate::auth::delegation::tests::test_minter;

        let minter = test_minter();
        Self::new(
            ledger,
            VaultBackend::memory("expenses", minter.verifying_key().clone()),
            minter,
        )
    }

    #[cfg(test)]
    pub fn memory_vault(&self) -> &crate::vault::InMemoryVault {
        self.vault
            .as_memory()
            .expect("test state uses the in-memory vault")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_acl_grants_app_read_and_write() {
        let state = AppState::in_memory();
        let acl = state.record_acl();
        assert_eq!(acl.grantee, state.minter.issuer_did());
        assert_eq!(acl.capabilities(), vec!["read", "write"]);
    }

    #[test]
    fn required_permissions_names_collection_and_grantee() {
        let state = AppState::in_memory();
        let required = state.required_permissions(&["write"]);
        assert_eq!(required.collection, "expenses");
        assert_eq!(required.grantee, state.minter.issuer_did());
        assert_eq!(required.capabilities, vec!["write"]);
        assert!(required.hint.contains("expenses"));
    }
}
