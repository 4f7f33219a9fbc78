//! Verifier: check an index against the part store without writing anything.

use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::PartConfig;
use crate::error::Result;
use crate::index::{read_index, OrdinalProblems};
use crate::store::PartStore;

#[derive(Debug, Clone, Serialize)]
pub struct PartIssue {
    pub ordinal: u64,
    pub hash: String,
    pub path: PathBuf,
    /// Hash of the file content when the part exists but does not match.
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub index_path: PathBuf,
    pub filename: String,
    pub version: u32,
    pub parts: usize,
    pub bytes: u64,
    pub ordinal_problems: OrdinalProblems,
    pub missing: Vec<PartIssue>,
    pub corrupt: Vec<PartIssue>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.ordinal_problems.is_empty() && self.missing.is_empty() && self.corrupt.is_empty()
    }
}

/// Fails only when the index itself cannot be read or parsed; part problems are
/// collected in the report.
pub fn verify_index(index_path: &Path, cfg: &PartConfig) -> Result<VerifyReport> {
    let index = read_index(index_path)?;
    let store = PartStore::open_ro(&cfg.store_dir).with_buf_bytes(cfg.buf_bytes);

    let mut report = VerifyReport {
        index_path: index_path.to_path_buf(),
        filename: index.filename.clone(),
        version: index.version,
        parts: index.len(),
        bytes: 0,
        ordinal_problems: index.ordinal_problems(),
        missing: Vec::new(),
        corrupt: Vec::new(),
    };

    for e in index.sorted_entries() {
        let path = store.part_path(&e.hash);
        match store.rehash(&e.hash)? {
            None => report.missing.push(PartIssue {
                ordinal: e.ordinal,
                hash: e.hash.clone(),
                path,
                actual: None,
            }),
            Some(actual) if actual != e.hash => report.corrupt.push(PartIssue {
                ordinal: e.ordinal,
                hash: e.hash.clone(),
                path,
                actual: Some(actual),
            }),
            Some(_) => report.bytes += store.size(&e.hash)?.unwrap_or(0),
        }
    }

    if report.is_ok() {
        info!(
            "verify: {} ok, {} part(s), {} B",
            index_path.display(),
            report.parts,
            report.bytes
        );
    } else {
        warn!(
            "verify: {} has problems: {} missing, {} corrupt, ordinal gaps={:?} dups={:?}",
            index_path.display(),
            report.missing.len(),
            report.corrupt.len(),
            report.ordinal_problems.missing,
            report.ordinal_problems.duplicated
        );
    }
    Ok(report)
}
