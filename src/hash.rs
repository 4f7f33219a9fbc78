//! Content hashing for part files.
//!
//! Parts are named by the SHA-256 of their raw bytes, rendered as lowercase hex.
//! The same helper is used by the splitter (naming), the merger in strict mode and the
//! verifier, so a part name is stable across split/merge cycles.

use sha2::{Digest, Sha256};

use crate::consts::HASH_HEX_LEN;

/// SHA-256 of the empty input. Every zero-length part is stored under this name.
pub const EMPTY_SHA256_HEX: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Streaming hasher fed chunk by chunk while a part is copied.
#[derive(Clone, Default)]
pub struct PartHasher {
    inner: Sha256,
    len: u64,
}

impl PartHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
        self.len += bytes.len() as u64;
    }

    /// Bytes hashed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish and return the lowercase hex digest.
    pub fn finish_hex(self) -> String {
        hex_encode(&self.inner.finalize())
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = PartHasher::new();
    h.update(bytes);
    h.finish_hex()
}

pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

/// True for exactly 64 lowercase hex digits.
pub fn is_hash_hex(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
