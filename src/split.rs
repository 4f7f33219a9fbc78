//! Splitter: source file -> N content-addressed parts + index.
//!
//! Partition rule: `base = size / n`; parts `0..n-1` get exactly `base` bytes and the
//! last part gets everything that remains. With `n > size` the leading parts are empty
//! and the last part holds the whole file.

use log::{debug, info};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::PartConfig;
use crate::error::{IoContext, PartError, Result};
use crate::index::{write_index, Index};
use crate::store::PartStore;

#[derive(Debug, Clone, Serialize)]
pub struct SplitPart {
    pub ordinal: u64,
    pub hash: String,
    pub bytes: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub source: String,
    pub source_bytes: u64,
    pub index_path: PathBuf,
    pub parts: Vec<SplitPart>,
}

impl SplitReport {
    /// Number of distinct part files written (duplicate content shares one file).
    pub fn distinct_files(&self) -> usize {
        let mut hashes: Vec<&str> = self.parts.iter().map(|p| p.hash.as_str()).collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes.len()
    }
}

/// Sizes of each part for a file of `file_size` bytes split into `num_parts`.
pub fn plan_part_sizes(file_size: u64, num_parts: u64) -> Result<Vec<u64>> {
    if num_parts == 0 {
        return Err(PartError::InvalidArgument(
            "number of parts must be >= 1".to_string(),
        ));
    }
    let base = file_size / num_parts;
    let last = file_size - base * (num_parts - 1);
    let mut sizes = Vec::with_capacity(num_parts.min(1 << 20) as usize);
    for i in 0..num_parts {
        sizes.push(if i + 1 == num_parts { last } else { base });
    }
    Ok(sizes)
}

/// Split `source` into `num_parts` parts stored under `cfg.store_dir`, and write the
/// index to `cfg.resolved_index_path()`. The source path is recorded as given and must
/// be valid UTF-8.
pub fn split_file(source: &Path, num_parts: u64, cfg: &PartConfig) -> Result<SplitReport> {
    if num_parts == 0 {
        return Err(PartError::InvalidArgument(
            "number of parts must be >= 1".to_string(),
        ));
    }

    // The index is UTF-8 text; a path it cannot hold exactly would merge elsewhere.
    let filename = source
        .to_str()
        .ok_or_else(|| {
            PartError::InvalidArgument(format!("{} is not valid UTF-8", source.display()))
        })?
        .to_string();

    let meta = fs::metadata(source).io_ctx("stat source", source)?;
    if !meta.is_file() {
        return Err(PartError::InvalidArgument(format!(
            "{} is not a regular file",
            source.display()
        )));
    }
    let file_size = meta.len();
    let sizes = plan_part_sizes(file_size, num_parts)?;
    let index_path = cfg.resolved_index_path();

    info!(
        "split: start, source={}, bytes={}, parts={}, store={}",
        source.display(),
        file_size,
        num_parts,
        cfg.store_dir.display()
    );

    let store = PartStore::open(&cfg.store_dir)?.with_buf_bytes(cfg.buf_bytes);
    let f = OpenOptions::new()
        .read(true)
        .open(source)
        .io_ctx("open source", source)?;
    let mut reader = BufReader::with_capacity(cfg.buf_bytes, f);

    let mut index = Index::new(filename.clone());
    let mut parts = Vec::with_capacity(sizes.len());

    for (ordinal, &want) in (0u64..).zip(sizes.iter()) {
        // the last part takes whatever is left
        let limit = if ordinal + 1 == num_parts { None } else { Some(want) };
        let (hash, bytes) = store.put_stream(&mut reader, limit)?;
        debug!("split: part {} -> {} ({} B)", ordinal, hash, bytes);
        let path = store.part_path(&hash);
        index.push(ordinal, hash.clone());
        parts.push(SplitPart {
            ordinal,
            hash,
            bytes,
            path,
        });
    }

    write_index(&index_path, &index)?;

    let report = SplitReport {
        source: filename,
        source_bytes: file_size,
        index_path,
        parts,
    };
    info!(
        "split: done, {} part(s), {} distinct file(s), index={}",
        report.parts.len(),
        report.distinct_files(),
        report.index_path.display()
    );
    Ok(report)
}
