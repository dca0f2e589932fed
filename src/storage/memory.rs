// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory ledger store for tests and ephemeral deployments.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use super::ledger_file::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct Inner {
    saved: Mutex<Option<Vec<String>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

/// Ledger store that keeps the persisted sequence in process memory.
///
/// Clones share the same contents, so a test can keep a handle and inspect
/// what the ledger persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already persisted sequence.
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        *store.saved() = Some(ids.into_iter().map(Into::into).collect());
        store
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Last persisted sequence, if any.
    pub fn persisted(&self) -> Option<Vec<String>> {
        self.saved().clone()
    }

    pub(crate) fn load(&self) -> StorageResult<Option<Vec<String>>> {
        Ok(self.saved().clone())
    }

    pub(crate) fn save(&self, ids: &[String]) -> StorageResult<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "writes disabled on memory store".to_string(),
            ));
        }
        *self.saved() = Some(ids.to_vec());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn saved(&self) -> MutexGuard<'_, Option<Vec<String>>> {
        self.inner
            .saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
