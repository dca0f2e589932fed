// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identifier ledger: the ids this service believes exist in the vault.
//!
//! ## Consistency
//!
//! Every mutation and the persist that follows it run inside one mutex
//! critical section, so concurrent requests can neither tear the sequence nor
//! write an older view over a newer one. The write itself runs on the
//! blocking pool; the lock is held until it completes. Reconciliation fetches remote records
//! without holding the lock and then removes only the ids that failed from the
//! *current* sequence; ids appended in the meantime survive.
//!
//! ## Persist policy
//!
//! - [`PersistPolicy::FailOpen`]: a failed write is logged and the in-memory
//!   mutation stands. A crash before the next successful write loses it.
//! - [`PersistPolicy::FailClosed`]: a failed write rolls the mutation back and
//!   is returned to the caller.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::str::FromStr;

use tokio::sync::Mutex;

use super::{LedgerStore, StorageError};

/// How the ledger reacts when persisting a mutation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    /// Keep the in-memory mutation, log the failure.
    #[default]
    FailOpen,
    /// Roll the in-memory mutation back and return the failure.
    FailClosed,
}

impl PersistPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistPolicy::FailOpen => "fail-open",
            PersistPolicy::FailClosed => "fail-closed",
        }
    }
}

impl fmt::Display for PersistPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersistPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(PersistPolicy::FailOpen),
            "fail-closed" | "closed" => Ok(PersistPolicy::FailClosed),
            other => Err(format!(
                "unknown persist policy '{other}' (expected 'fail-open' or 'fail-closed')"
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to persist ledger: {0}")]
    Persist(#[source] StorageError),
}

/// Outcome of [`IdentifierLedger::reconcile_against`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<T> {
    /// Fetched payloads, in ledger order.
    pub resolved: Vec<(String, T)>,
    /// Ids whose fetch failed; they are no longer in the ledger.
    pub failed_ids: Vec<String>,
}

impl<T> Reconciliation<T> {
    pub fn failed_count(&self) -> usize {
        self.failed_ids.len()
    }

    pub fn into_payloads(self) -> Vec<T> {
        self.resolved.into_iter().map(|(_, payload)| payload).collect()
    }
}

/// Ordered, persisted list of record identifiers created in the vault.
#[derive(Debug)]
pub struct IdentifierLedger {
    ids: Mutex<Vec<String>>,
    store: LedgerStore,
    policy: PersistPolicy,
}

impl IdentifierLedger {
    /// Load the persisted sequence.
    ///
    /// A missing or unreadable ledger is the first-run case and yields an
    /// empty sequence.
    pub fn load(store: LedgerStore, policy: PersistPolicy) -> Self {
        let ids = match store.load() {
            Ok(Some(ids)) => ids,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = ?store.path(),
                    "Ledger could not be read, starting with an empty ledger"
                );
                Vec::new()
            }
        };

        Self {
            ids: Mutex::new(ids),
            store,
            policy,
        }
    }

    /// Empty ledger persisted in memory.
    pub fn in_memory() -> Self {
        Self::load(LedgerStore::memory(), PersistPolicy::default())
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn policy(&self) -> PersistPolicy {
        self.policy
    }

    /// Snapshot of the tracked ids in creation order.
    pub async fn ids(&self) -> Vec<String> {
        self.ids.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.ids.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ids.lock().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.ids.lock().await.iter().any(|known| known == id)
    }

    /// Track a newly created record id.
    pub async fn append(&self, id: impl Into<String>) -> Result<(), LedgerError> {
        let id = id.into();
        self.mutate(move |ids| {
            ids.push(id);
            true
        })
        .await
        .map(|_| ())
    }

    /// Stop tracking `id` (every occurrence). Returns whether it was tracked.
    pub async fn remove(&self, id: &str) -> Result<bool, LedgerError> {
        self.mutate(|ids| {
            let before = ids.len();
            ids.retain(|known| known != id);
            ids.len() != before
        })
        .await
    }

    /// Stop tracking every id in `remove`, persisting once.
    /// Returns the number of entries dropped.
    pub async fn remove_many<S: AsRef<str>>(&self, remove: &[S]) -> Result<usize, LedgerError> {
        let remove: HashSet<&str> = remove.iter().map(AsRef::as_ref).collect();
        if remove.is_empty() {
            return Ok(0);
        }

        let mut dropped = 0;
        self.mutate(|ids| {
            let before = ids.len();
            ids.retain(|known| !remove.contains(known.as_str()));
            dropped = before - ids.len();
            dropped > 0
        })
        .await?;
        Ok(dropped)
    }

    /// Fetch every tracked id and prune the ones that fail.
    ///
    /// Fetches run one after another without holding the ledger lock. Any
    /// fetch error counts as the record being gone; transient failures are
    /// pruned as well, which is logged per id.
    pub async fn reconcile_against<F, Fut, T, E>(
        &self,
        mut fetch: F,
    ) -> Result<Reconciliation<T>, LedgerError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let snapshot = self.ids().await;
        let mut resolved = Vec::with_capacity(snapshot.len());
        let mut failed_ids = Vec::new();

        for id in snapshot {
            match fetch(id.clone()).await {
                Ok(payload) => resolved.push((id, payload)),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Tracked record did not resolve, pruning");
                    failed_ids.push(id);
                }
            }
        }

        if !failed_ids.is_empty() {
            self.remove_many(&failed_ids).await?;
            tracing::info!(
                pruned = failed_ids.len(),
                resolved = resolved.len(),
                "Ledger reconciled"
            );
        }

        Ok(Reconciliation {
            resolved,
            failed_ids,
        })
    }

    /// Write the current sequence to the store.
    ///
    /// Unlike the implicit persist after a mutation, an explicit persist
    /// always reports failure.
    pub async fn persist(&self) -> Result<(), LedgerError> {
        let ids = self.ids.lock().await;
        self.save_snapshot(ids.clone())
            .await
            .map_err(LedgerError::Persist)
    }

    /// Write `ids` to the store from the blocking thread pool.
    async fn save_snapshot(&self, ids: Vec<String>) -> Result<(), StorageError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&ids))
            .await
            .map_err(|e| StorageError::Unavailable(format!("ledger write task failed: {e}")))?
    }

    /// Apply `change` and persist when it reports a modification.
    async fn mutate(
        &self,
        change: impl FnOnce(&mut Vec<String>) -> bool,
    ) -> Result<bool, LedgerError> {
        let mut ids = self.ids.lock().await;
        let rollback = (self.policy == PersistPolicy::FailClosed).then(|| ids.clone());

        if !change(&mut ids) {
            return Ok(false);
        }

        match self.save_snapshot(ids.clone()).await {
            Ok(()) => Ok(true),
            Err(e) => match rollback {
                Some(previous) => {
                    *ids = previous;
                    tracing::error!(error = %e, "Ledger persist failed, mutation rolled back");
                    Err(LedgerError::Persist(e))
                }
                None => {
                    tracing::error!(
                        error = %e,
                        tracked = ids.len(),
                        "Ledger persist failed, keeping in-memory state"
                    );
                    Ok(true)
                }
            },
        }
    }
}
