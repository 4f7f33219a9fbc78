//! Format constants shared by the splitter, merger and index parser.

// -------- Index file --------
pub const INDEX_FILE: &str = "index.txt";
pub const FILENAME_MARKER: &str = "FILENAME:";
pub const VERSION_MARKER: &str = "VERSION:";
pub const ENTRY_SEPARATOR: &str = ", ";

/// Index format written by this crate. An index without a version line is read as v1.
pub const INDEX_VERSION: u32 = 1;

// -------- Part files --------
pub const PART_EXT: &str = "part";
pub const TMP_EXT: &str = "tmp";

// -------- Hashing --------
/// SHA-256 rendered as lowercase hex.
pub const HASH_HEX_LEN: usize = 64;

// -------- I/O --------
pub const DEFAULT_BUF_BYTES: usize = 64 * 1024;
