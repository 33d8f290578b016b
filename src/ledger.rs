//! Progress ledger
//!
//! Durable list of log files that have been fully ingested, stored as
//! `{"files": [...]}`. The document is re-read on every call rather than
//! cached. `mark_done` writes the whole document to a `.tmp` sibling and
//! renames it over the ledger, so a killed process leaves either the old
//! or the new document. There is no locking: two processes sharing a
//! ledger can both see a file as pending.

use crate::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerDocument {
    #[serde(default)]
    pub files: Vec<String>,
}

/// Handle to the ledger file
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
}

impl ProgressLedger {
    /// Open a ledger at `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Read the full document. A missing file is an empty ledger.
    pub fn load(&self) -> LedgerResult<LedgerDocument> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LedgerDocument::default()),
            Err(e) => {
                return Err(LedgerError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(LedgerDocument::default());
        }

        serde_json::from_str(&contents).map_err(|e| LedgerError::Malformed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Completed paths as a set, for planning a partition
    pub fn snapshot(&self) -> LedgerResult<HashSet<String>> {
        Ok(self.load()?.files.into_iter().collect())
    }

    /// Check whether `path` has been fully ingested
    pub fn is_done(&self, path: &str) -> LedgerResult<bool> {
        Ok(self.load()?.files.iter().any(|f| f == path))
    }

    /// Record `path` as fully ingested
    pub fn mark_done(&self, path: &str) -> LedgerResult<()> {
        let mut doc = self.load()?;
        doc.files.push(path.to_string());

        let json = serde_json::to_string(&doc).map_err(|e| LedgerError::Malformed {
            path: self.path.clone(),
            source: e,
        })?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|e| LedgerError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| LedgerError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(path, entries = doc.files.len(), "Ledger updated");
        Ok(())
    }
}
