// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage
//!
//! The vault has no "list documents" primitive, so the service keeps its own
//! ledger of the record identifiers it created. This module owns that ledger
//! and where it is persisted.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   ledger.json     # ["<record id>", "<record id>", ...] in creation order
//! ```
//!
//! The file is rewritten in full (temp file + rename) after every mutation.

pub mod ledger;
pub mod ledger_file;
pub mod memory;

use std::path::{Path, PathBuf};

pub use ledger::{IdentifierLedger, LedgerError, PersistPolicy, Reconciliation};
pub use ledger_file::{LedgerFile, StorageError, StorageResult};
pub use memory::MemoryLedgerStore;

/// Where the ledger sequence is persisted.
#[derive(Debug, Clone)]
pub enum LedgerStore {
    /// JSON array file on disk
    File(LedgerFile),
    /// Process memory (tests, ephemeral runs)
    Memory(MemoryLedgerStore),
}

impl LedgerStore {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(LedgerFile::new(path))
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryLedgerStore::new())
    }

    /// Path of the backing file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(file) => Some(file.path()),
            Self::Memory(_) => None,
        }
    }

    /// Read the persisted sequence. `Ok(None)` means nothing was persisted yet.
    pub fn load(&self) -> StorageResult<Option<Vec<String>>> {
        match self {
            Self::File(file) => file.read_json(),
            Self::Memory(store) => store.load(),
        }
    }

    /// Overwrite the persisted sequence.
    pub fn save(&self, ids: &[String]) -> StorageResult<()> {
        match self {
            Self::File(file) => file.write_json(&ids),
            Self::Memory(store) => store.save(ids),
        }
    }
}
