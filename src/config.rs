//! Configuration for split/merge runs.
//!
//! - `PartConfig::default()` reproduces the plain behavior: parts and `index.txt` live in
//!   the current working directory, merge does not re-hash.
//! - `PartConfig::from_env()` applies env overrides on top of the defaults.
//! - `with_*` setters let the CLI (or a test) override single fields.
//!
//! Env:
//! - PARTFILE_DIR        — part store directory (default ".")
//! - PARTFILE_INDEX      — index path for split (default "<store>/index.txt")
//! - PARTFILE_VERIFY     — strict merge, "1|true|on|yes" => true (default false)
//! - PARTFILE_BUF_BYTES  — copy buffer size in bytes (default 65536, 0 is ignored)

use std::fmt;
use std::path::{Path, PathBuf};

use crate::consts::{DEFAULT_BUF_BYTES, INDEX_FILE};

#[derive(Clone, Debug)]
pub struct PartConfig {
    /// Directory holding `<hash>.part` files.
    pub store_dir: PathBuf,

    /// Explicit index path for split. If None: `<store_dir>/index.txt`.
    pub index_path: Option<PathBuf>,

    /// Re-hash parts during merge and reject ordinal gaps/duplicates.
    pub verify_on_merge: bool,

    /// Copy buffer size used when streaming parts.
    pub buf_bytes: usize,
}

impl Default for PartConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("."),
            index_path: None,
            verify_on_merge: false,
            buf_bytes: DEFAULT_BUF_BYTES,
        }
    }
}

impl PartConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PARTFILE_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.store_dir = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("PARTFILE_INDEX") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.index_path = Some(PathBuf::from(s));
            }
        }

        if let Ok(v) = std::env::var("PARTFILE_VERIFY") {
            cfg.verify_on_merge = parse_flag(&v);
        }

        if let Ok(v) = std::env::var("PARTFILE_BUF_BYTES") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.buf_bytes = n;
                }
            }
        }

        cfg
    }

    pub fn with_store_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.store_dir = dir.into();
        self
    }

    pub fn with_index_path<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.index_path = path.map(Into::into);
        self
    }

    pub fn with_verify_on_merge(mut self, on: bool) -> Self {
        self.verify_on_merge = on;
        self
    }

    pub fn with_buf_bytes(mut self, n: usize) -> Self {
        self.buf_bytes = n.max(1);
        self
    }

    /// Index path used by split.
    pub fn resolved_index_path(&self) -> PathBuf {
        match &self.index_path {
            Some(p) => p.clone(),
            None => self.store_dir.join(INDEX_FILE),
        }
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }
}

fn parse_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "on" || s == "yes"
}

impl fmt::Display for PartConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PartConfig {{ \
             store_dir: {}, \
             index_path: {}, \
             verify_on_merge: {}, \
             buf_bytes: {} \
             }}",
            self.store_dir.display(),
            self.index_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default(<store>/index.txt)".to_string()),
            self.verify_on_merge,
            self.buf_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing() {
        for on in ["1", "true", "ON", " yes "] {
            assert!(parse_flag(on), "{on} must enable");
        }
        for off in ["0", "false", "", "nope"] {
            assert!(!parse_flag(off), "{off} must disable");
        }
    }

    #[test]
    fn default_index_lives_in_store() {
        let cfg = PartConfig::default().with_store_dir("/tmp/parts");
        assert_eq!(
            cfg.resolved_index_path(),
            PathBuf::from("/tmp/parts").join(INDEX_FILE)
        );
        let cfg = cfg.with_index_path(Some("manifest.txt"));
        assert_eq!(cfg.resolved_index_path(), PathBuf::from("manifest.txt"));
    }
}
