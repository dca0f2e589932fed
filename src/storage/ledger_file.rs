// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed persistence for the identifier ledger.
//!
//! The ledger is a single JSON array of identifier strings. Every write
//! replaces the whole file: the array is serialized to a sibling `.tmp`
//! file which is then renamed over the target, so a reader never observes
//! a half-written ledger.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

/// Error type for ledger storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Store refused the operation (in-memory store with injected failures)
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A JSON document stored at a fixed path.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and deserialize the file.
    ///
    /// Returns `Ok(None)` when the file does not exist yet.
    pub fn read_json<T: DeserializeOwned>(&self) -> StorageResult<Option<T>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)?;
        Ok(Some(value))
    }

    /// Write the file (atomic write via rename).
    pub fn write_json<T: Serialize>(&self, value: &T) -> StorageResult<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, value)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let file = LedgerFile::new(dir.path().join("ledger.json"));

        let value: Option<Vec<String>> = file.read_json().unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn write_then_read_json_array() {
        let dir = TempDir::new().unwrap();
        let file = LedgerFile::new(dir.path().join("ledger.json"));
        let ids = vec!["a".to_string(), "b".to_string()];

        file.write_json(&ids).unwrap();

        let raw = fs::read_to_string(file.path()).unwrap();
        assert_eq!(raw, r#"["a","b"]"#);
        let read: Option<Vec<String>> = file.read_json().unwrap();
        assert_eq!(read, Some(ids));
    }

    #[test]
    fn write_creates_parent_directories_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state").join("ledger.json");
        let file = LedgerFile::new(&path);

        file.write_json(&vec!["x".to_string()]).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"{not json").unwrap();

        let result = LedgerFile::new(&path).read_json::<Vec<String>>();
        assert!(matches!(result, Err(StorageError::Json(_))));
    }
}
