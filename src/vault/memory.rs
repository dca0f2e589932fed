// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process vault for tests and local development.
//!
//! Behaves like a vault node: it checks that each call carries a token signed
//! by the application key, unexpired and scoped to the right operation, keeps an access-control list per
//! record, and reports missing records as [`VaultError::NotFound`]. Tests can
//! deny whole operations and inspect the call log.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use k256::ecdsa::VerifyingKey;
use tokio::sync::RwLock;

use super::{AccessControl, VaultError, VaultResult};
use crate::auth::{delegation::verify_token, DelegationToken, Operation};
use crate::models::ExpenseRecord;

#[derive(Debug, Clone)]
struct StoredDocument {
    record: ExpenseRecord,
    acl: Vec<AccessControl>,
}

/// One call received by the in-memory vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultCall {
    pub operation: Operation,
    pub document_id: String,
    /// `jti` of the token that authorized the call
    pub token_id: String,
}

#[derive(Debug)]
pub struct InMemoryVault {
    collection: String,
    /// Key every accepted token must be signed with
    verifying_key: VerifyingKey,
    documents: RwLock<HashMap<String, StoredDocument>>,
    denied: Mutex<HashSet<Operation>>,
    calls: Mutex<Vec<VaultCall>>,
}

impl InMemoryVault {
    pub fn new(collection: impl Into<String>, verifying_key: VerifyingKey) -> Self {
        Self {
            collection: collection.into(),
            verifying_key,
            documents: RwLock::new(HashMap::new()),
            denied: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Refuse every subsequent call for `operation` with permission denied.
    pub fn deny(&self, operation: Operation) {
        lock(&self.denied).insert(operation);
    }

    pub fn allow(&self, operation: Operation) {
        lock(&self.denied).remove(&operation);
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<VaultCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Place a record directly, bypassing tokens and the call log.
    pub async fn insert(&self, record: ExpenseRecord) {
        self.documents.write().await.insert(
            record.id.clone(),
            StoredDocument {
                record,
                acl: Vec::new(),
            },
        );
    }

    /// Drop a record directly, as if it expired remotely.
    pub async fn forget(&self, id: &str) -> bool {
        self.documents.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn acl(&self, id: &str) -> Option<Vec<AccessControl>> {
        self.documents
            .read()
            .await
            .get(id)
            .map(|document| document.acl.clone())
    }

    pub(crate) async fn create_record(
        &self,
        token: &DelegationToken,
        record: &ExpenseRecord,
        acl: &AccessControl,
    ) -> VaultResult<String> {
        self.authorize(token, Operation::Create, &record.id)?;

        let mut documents = self.documents.write().await;
        if documents.contains_key(&record.id) {
            return Err(VaultError::Rejected {
                status: 409,
                body: format!("document {} already exists", record.id),
            });
        }
        documents.insert(
            record.id.clone(),
            StoredDocument {
                record: record.clone(),
                acl: vec![acl.clone()],
            },
        );
        Ok(record.id.clone())
    }

    pub(crate) async fn read_record(
        &self,
        token: &DelegationToken,
        id: &str,
    ) -> VaultResult<ExpenseRecord> {
        self.authorize(token, Operation::Read, id)?;
        self.documents
            .read()
            .await
            .get(id)
            .map(|document| document.record.clone())
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    pub(crate) async fn update_record(
        &self,
        token: &DelegationToken,
        record: &ExpenseRecord,
    ) -> VaultResult<()> {
        self.authorize(token, Operation::Update, &record.id)?;
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(&record.id)
            .ok_or_else(|| VaultError::NotFound(record.id.clone()))?;
        document.record = record.clone();
        Ok(())
    }

    pub(crate) async fn delete_record(&self, token: &DelegationToken, id: &str) -> VaultResult<()> {
        self.authorize(token, Operation::Delete, id)?;
        self.documents
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    pub(crate) async fn grant_access(
        &self,
        token: &DelegationToken,
        document_id: &str,
        acl: &AccessControl,
    ) -> VaultResult<()> {
        self.authorize(token, Operation::Update, document_id)?;
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(document_id)
            .ok_or_else(|| VaultError::NotFound(document_id.to_string()))?;
        document.acl.retain(|entry| entry.grantee != acl.grantee);
        document.acl.push(acl.clone());
        Ok(())
    }

    pub(crate) async fn revoke_access(
        &self,
        token: &DelegationToken,
        document_id: &str,
        grantee: &str,
    ) -> VaultResult<()> {
        self.authorize(token, Operation::Update, document_id)?;
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(document_id)
            .ok_or_else(|| VaultError::NotFound(document_id.to_string()))?;
        document.acl.retain(|entry| entry.grantee != grantee);
        Ok(())
    }

    fn authorize(
        &self,
        token: &DelegationToken,
        expected: Operation,
        document_id: &str,
    ) -> VaultResult<()> {
        lock(&self.calls).push(VaultCall {
            operation: expected,
            document_id: document_id.to_string(),
            token_id: token.claims().jti.clone(),
        });

        let claims = verify_token(token.as_str(), &self.verifying_key, Utc::now())
            .map_err(|e| VaultError::PermissionDenied(format!("{e} ({})", e.error_code())))?;
        if claims.operation() != Some(expected) {
            return Err(VaultError::PermissionDenied(format!(
                "token command {} does not authorize {expected}",
                claims.cmd
            )));
        }
        if lock(&self.denied).contains(&expected) {
            return Err(VaultError::PermissionDenied(format!(
                "{} may not {expected} in collection {}",
                claims.iss, self.collection
            )));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
