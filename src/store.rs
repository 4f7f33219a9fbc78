//! store — flat content-addressed directory of part files.
//!
//! Layout: `<dir>/<sha256-hex>.part`. A part is written to
//! `<dir>/.part.incoming-<pid>-<n>.tmp` while it is hashed, then renamed to its final
//! name. Writing content that already exists simply replaces the file with identical
//! bytes.

use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::consts::{DEFAULT_BUF_BYTES, PART_EXT, TMP_EXT};
use crate::error::{IoContext, PartError, Result};
use crate::hash::{is_hash_hex, PartHasher};

pub struct PartStore {
    dir: PathBuf,
    buf_bytes: usize,
}

impl PartStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).io_ctx("create store dir", dir)?;
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            buf_bytes: DEFAULT_BUF_BYTES,
        })
    }

    /// Reader-side open: the directory is not created. A missing directory simply
    /// holds no parts.
    pub fn open_ro(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            buf_bytes: DEFAULT_BUF_BYTES,
        }
    }

    pub fn with_buf_bytes(mut self, n: usize) -> Self {
        self.buf_bytes = n.max(1);
        self
    }

    pub fn dir_path(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<hash>.part`. The hash is not validated here.
    pub fn part_path(&self, hash_hex: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash_hex, PART_EXT))
    }

    pub fn has(&self, hash_hex: &str) -> bool {
        self.part_path(hash_hex).is_file()
    }

    pub fn size(&self, hash_hex: &str) -> Result<Option<u64>> {
        let p = self.part_path(hash_hex);
        match fs::metadata(&p) {
            Ok(m) => Ok(Some(m.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PartError::from_io(e, "stat part", &p)),
        }
    }

    pub fn open_part(&self, hash_hex: &str) -> Result<File> {
        let p = self.part_path(hash_hex);
        OpenOptions::new().read(true).open(&p).io_ctx("open part", &p)
    }

    /// Store in-memory bytes. Returns the hex hash.
    pub fn put(&self, bytes: &[u8]) -> Result<String> {
        let mut src = bytes;
        let (hash, _) = self.put_stream(&mut src, None)?;
        Ok(hash)
    }

    /// Copy up to `limit` bytes (or until EOF when `limit` is None) from `src` into the
    /// store. Returns `(hash_hex, bytes_written)`.
    ///
    /// A source that ends before `limit` bytes is an `UnexpectedEof` I/O error: the
    /// partition was planned from the file size, so a short read means the file changed.
    pub fn put_stream<R: Read>(&self, src: &mut R, limit: Option<u64>) -> Result<(String, u64)> {
        let (tmp, mut out) = create_incoming(&self.dir.join(PART_EXT))?;
        let mut hasher = PartHasher::new();

        let res = copy_hashing(src, &mut out, &mut hasher, limit, self.buf_bytes, &tmp);
        drop(out);
        let copied = match res {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };

        if let Some(want) = limit {
            if copied < want {
                let _ = fs::remove_file(&tmp);
                return Err(PartError::Io {
                    context: format!(
                        "short read into part: expected {} bytes, source ended after {}",
                        want, copied
                    ),
                    source: std::io::ErrorKind::UnexpectedEof.into(),
                });
            }
        }

        let hash = hasher.finish_hex();
        let final_path = self.part_path(&hash);
        if let Err(e) = fs::rename(&tmp, &final_path) {
            let _ = fs::remove_file(&tmp);
            return Err(PartError::from_io(e, "rename tmp part to", &final_path));
        }
        debug!("store: put {} ({} B)", final_path.display(), copied);
        Ok((hash, copied))
    }

    /// Re-hash a stored part and compare with its name.
    /// Returns Ok(None) if the part is absent, Ok(Some(actual_hash)) otherwise.
    pub fn rehash(&self, hash_hex: &str) -> Result<Option<String>> {
        let p = self.part_path(hash_hex);
        let mut f = match OpenOptions::new().read(true).open(&p) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PartError::from_io(e, "open part", &p)),
        };
        let mut hasher = PartHasher::new();
        let mut buf = vec![0u8; self.buf_bytes];
        loop {
            let n = f.read(&mut buf).io_ctx("read part", &p)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Some(hasher.finish_hex()))
    }

    /// True if the part exists and its content still hashes to its name.
    pub fn verify_part(&self, hash_hex: &str) -> Result<bool> {
        if !is_hash_hex(hash_hex) {
            return Ok(false);
        }
        Ok(self.rehash(hash_hex)?.as_deref() == Some(hash_hex))
    }
}

static NEXT_INCOMING: AtomicU64 = AtomicU64::new(0);

/// Create a fresh temp file next to `target`, named `.<name>.incoming-<pid>-<n>.tmp`.
/// Opened with `create_new`, so an existing file is never truncated; on a name clash
/// the next counter value is tried.
pub(crate) fn create_incoming(target: &Path) -> Result<(PathBuf, File)> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let pid = std::process::id();
    loop {
        let n = NEXT_INCOMING.fetch_add(1, Ordering::Relaxed);
        let tmp = target.with_file_name(format!(".{}.incoming-{}-{}.{}", name, pid, n, TMP_EXT));
        match OpenOptions::new().write(true).create_new(true).open(&tmp) {
            Ok(f) => return Ok((tmp, f)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(PartError::from_io(e, "create temp file", &tmp)),
        }
    }
}

/// Copy from `src` to `out`, feeding `hasher`, stopping at `limit` bytes if given.
pub(crate) fn copy_hashing<R: Read, W: Write>(
    src: &mut R,
    out: &mut W,
    hasher: &mut PartHasher,
    limit: Option<u64>,
    buf_bytes: usize,
    out_path: &Path,
) -> Result<u64> {
    let mut buf = vec![0u8; buf_bytes.max(1)];
    let mut copied: u64 = 0;
    loop {
        let want = match limit {
            Some(l) => {
                let left = l - copied;
                if left == 0 {
                    break;
                }
                left.min(buf.len() as u64) as usize
            }
            None => buf.len(),
        };
        let n = match src.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(PartError::Io {
                    context: "read source".to_string(),
                    source: e,
                })
            }
        };
        hasher.update(&buf[..n]);
        out.write_all(&buf[..n]).io_ctx("write", out_path)?;
        copied += n as u64;
    }
    Ok(copied)
}
