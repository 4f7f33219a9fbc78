//! Merger: index + parts -> reconstructed file.
//!
//! Steps:
//! 1) read the index (header mandatory, malformed entry lines skipped);
//! 2) sort entries by ordinal;
//! 3) resolve every part before touching the output, so a missing part aborts with
//!    the target left as it was;
//! 4) stream parts into a fresh hidden `.<target>.incoming-<pid>-<n>.tmp` next to the
//!    target and rename it over the target.
//!
//! Strict mode (`MergeOptions::verify`) re-hashes each part while copying and rejects
//! ordinal gaps or duplicates. Without it, gaps/duplicates are only logged.

use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::config::PartConfig;
use crate::error::{IoContext, PartError, Result};
use crate::hash::PartHasher;
use crate::index::{read_index, IndexEntry};
use crate::store::{copy_hashing, create_incoming, PartStore};

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Re-hash parts and reject ordinal gaps/duplicates.
    pub verify: bool,
    /// Write here instead of the filename recorded in the index.
    pub output: Option<PathBuf>,
}

impl MergeOptions {
    pub fn from_config(cfg: &PartConfig) -> Self {
        Self {
            verify: cfg.verify_on_merge,
            output: None,
        }
    }

    pub fn with_verify(mut self, on: bool) -> Self {
        self.verify = on;
        self
    }

    pub fn with_output<P: Into<PathBuf>>(mut self, out: Option<P>) -> Self {
        self.output = out.map(Into::into);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub index_path: PathBuf,
    pub output: PathBuf,
    pub parts: usize,
    pub bytes: u64,
    pub verified: bool,
}

pub fn merge_index(index_path: &Path, opts: &MergeOptions, cfg: &PartConfig) -> Result<MergeReport> {
    let index = read_index(index_path)?;
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&index.filename));

    info!(
        "merge: start, index={}, parts={}, output={}, verify={}",
        index_path.display(),
        index.len(),
        output.display(),
        opts.verify
    );

    let problems = index.ordinal_problems();
    if !problems.is_empty() {
        if opts.verify {
            return Err(PartError::Parse(format!(
                "ordinal set is not contiguous: missing={:?}, duplicated={:?}",
                problems.missing, problems.duplicated
            )));
        }
        warn!(
            "merge: ordinal set is not contiguous (missing={:?}, duplicated={:?}), merging in sorted order",
            problems.missing, problems.duplicated
        );
    }

    let store = PartStore::open_ro(&cfg.store_dir).with_buf_bytes(cfg.buf_bytes);
    let entries = index.sorted_entries();

    for e in &entries {
        if !store.has(&e.hash) {
            return Err(missing_part(&store, e));
        }
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).io_ctx("create output dir", parent)?;
        }
    }
    let (tmp, f) = create_incoming(&output)?;
    let bytes = match write_parts(&store, &entries, f, &tmp, opts.verify, cfg.buf_bytes) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    if let Err(e) = fs::rename(&tmp, &output) {
        let _ = fs::remove_file(&tmp);
        return Err(PartError::from_io(e, "rename merged output to", &output));
    }

    info!(
        "merge: done, {} part(s), {} B -> {}",
        entries.len(),
        bytes,
        output.display()
    );
    Ok(MergeReport {
        index_path: index_path.to_path_buf(),
        output,
        parts: entries.len(),
        bytes,
        verified: opts.verify,
    })
}

fn write_parts(
    store: &PartStore,
    entries: &[&IndexEntry],
    f: fs::File,
    tmp: &Path,
    verify: bool,
    buf_bytes: usize,
) -> Result<u64> {
    let mut out = BufWriter::with_capacity(buf_bytes, f);
    let mut total: u64 = 0;

    for e in entries {
        let mut part = match store.open_part(&e.hash) {
            Ok(f) => f,
            // removed between the up-front check and now
            Err(PartError::NotFound { .. }) => return Err(missing_part(store, e)),
            Err(err) => return Err(err),
        };
        let mut hasher = PartHasher::new();
        let n = copy_hashing(&mut part, &mut out, &mut hasher, None, buf_bytes, tmp)?;
        if verify {
            let actual = hasher.finish_hex();
            if actual != e.hash {
                return Err(PartError::Corrupt {
                    ordinal: e.ordinal,
                    expected: e.hash.clone(),
                    actual,
                });
            }
        }
        debug!("merge: part {} ({}) {} B", e.ordinal, e.hash, n);
        total += n;
    }

    let f = out
        .into_inner()
        .map_err(|e| PartError::from_io(e.into_error(), "flush merged output", tmp))?;
    f.sync_all().io_ctx("sync merged output", tmp)?;
    Ok(total)
}

fn missing_part(store: &PartStore, e: &IndexEntry) -> PartError {
    PartError::MissingPart {
        ordinal: e.ordinal,
        hash: e.hash.clone(),
        path: store.part_path(&e.hash),
    }
}
