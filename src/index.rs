//! index — the text manifest linking an original filename to its ordered parts.
//!
//! Format (UTF-8, one record per line):
//!
//! ```text
//! FILENAME: <path as given at split time>
//! VERSION: 1
//! 0, <sha256-hex>
//! 1, <sha256-hex>
//! ...
//! ```
//!
//! The FILENAME header must be the first non-blank line. The VERSION line is optional
//! and only read right after the header (absent or unreadable means v1). Any other
//! line that is not `<ordinal>, <hash>` is skipped, so newer writers can add records without breaking older readers. Entry order in the
//! file is not trusted; use `sorted_entries()` before reassembly.

use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::consts::{ENTRY_SEPARATOR, FILENAME_MARKER, INDEX_VERSION, VERSION_MARKER};
use crate::error::{IoContext, PartError, Result};
use crate::hash::is_hash_hex;
use crate::store::create_incoming;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub ordinal: u64,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub filename: String,
    pub version: u32,
    pub entries: Vec<IndexEntry>,
}

/// Ordinal set deviations from `{0, ..., N-1}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrdinalProblems {
    pub missing: Vec<u64>,
    pub duplicated: Vec<u64>,
}

impl OrdinalProblems {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty()
    }
}

impl Index {
    pub fn new<S: Into<String>>(filename: S) -> Self {
        Self {
            filename: filename.into(),
            version: INDEX_VERSION,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, ordinal: u64, hash: String) {
        self.entries.push(IndexEntry { ordinal, hash });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by ascending ordinal. The sort is stable, so duplicated ordinals keep
    /// file order.
    pub fn sorted_entries(&self) -> Vec<&IndexEntry> {
        let mut v: Vec<&IndexEntry> = self.entries.iter().collect();
        v.sort_by_key(|e| e.ordinal);
        v
    }

    /// Compare the ordinal set against `{0, ..., max}`.
    pub fn ordinal_problems(&self) -> OrdinalProblems {
        let mut seen: BTreeMap<u64, u32> = BTreeMap::new();
        for e in &self.entries {
            *seen.entry(e.ordinal).or_insert(0) += 1;
        }
        let mut out = OrdinalProblems::default();
        let max = match seen.keys().next_back() {
            Some(&m) => m,
            None => return out,
        };
        for ord in 0..=max {
            match seen.get(&ord) {
                None => out.missing.push(ord),
                Some(&n) if n > 1 => out.duplicated.push(ord),
                Some(_) => {}
            }
        }
        out
    }

    /// Text form, entries in stored order.
    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("{} {}\n", FILENAME_MARKER, self.filename));
        s.push_str(&format!("{} {}\n", VERSION_MARKER, self.version));
        for e in &self.entries {
            s.push_str(&format!("{}{}{}\n", e.ordinal, ENTRY_SEPARATOR, e.hash));
        }
        s
    }
}

/// Parse one `<ordinal>, <hash>` line. Anything else yields None.
pub fn parse_entry_line(line: &str) -> Option<IndexEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (ord, hash) = line.split_once(ENTRY_SEPARATOR)?;
    let ordinal = ord.trim().parse::<u64>().ok()?;
    let hash = hash.trim();
    if !is_hash_hex(hash) {
        return None;
    }
    Some(IndexEntry {
        ordinal,
        hash: hash.to_string(),
    })
}

/// `VERSION: <n>` -> Some(Some(n)); marker with an unreadable value -> Some(None);
/// anything else -> None.
fn parse_version_line(line: &str) -> Option<Option<u32>> {
    let rest = line.trim().strip_prefix(VERSION_MARKER)?;
    Some(rest.trim().parse::<u32>().ok())
}

/// Parse index text: mandatory header, optional version line right after it, then
/// entries filtered out of the remaining lines.
pub fn parse_index(text: &str) -> Result<Index> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();

    let header = lines
        .next()
        .ok_or_else(|| PartError::Parse("empty index".to_string()))?;
    let filename = header
        .strip_prefix(FILENAME_MARKER)
        .map(str::trim)
        .ok_or_else(|| {
            PartError::Parse(format!(
                "first line must be '{} <path>', got '{}'",
                FILENAME_MARKER,
                header.trim_end()
            ))
        })?;
    if filename.is_empty() {
        return Err(PartError::Parse("empty filename in header".to_string()));
    }

    let mut version = INDEX_VERSION;
    if let Some(line) = lines.next_if(|l| parse_version_line(l).is_some()) {
        match parse_version_line(line).flatten() {
            Some(v) => version = v,
            None => debug!("index: skip unreadable version line '{}'", line.trim()),
        }
    }
    if version == 0 || version > INDEX_VERSION {
        return Err(PartError::Parse(format!(
            "unsupported index version {} (supported: 1..={})",
            version, INDEX_VERSION
        )));
    }

    let entries = lines
        .filter_map(|line| {
            let entry = parse_entry_line(line);
            if entry.is_none() {
                debug!("index: skip malformed line '{}'", line.trim_end());
            }
            entry
        })
        .collect();

    Ok(Index {
        filename: filename.to_string(),
        version,
        entries,
    })
}

pub fn read_index(path: &Path) -> Result<Index> {
    let text = fs::read_to_string(path).io_ctx("read index", path)?;
    parse_index(&text)
}

/// Write the index via a fresh hidden temp file + rename, creating the parent directory
/// if needed.
pub fn write_index(path: &Path, index: &Index) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).io_ctx("create index dir", parent)?;
        }
    }
    let (tmp, mut f) = create_incoming(path)?;
    let written = f
        .write_all(index.render().as_bytes())
        .and_then(|_| f.sync_all())
        .io_ctx("write index", &tmp);
    drop(f);
    let renamed = written.and_then(|_| fs::rename(&tmp, path).io_ctx("rename tmp index to", path));
    if let Err(e) = renamed {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
