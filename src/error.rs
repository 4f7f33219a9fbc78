use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartError {
    #[error("not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index parse error: {0}")]
    Parse(String),

    #[error("missing part #{ordinal} ({hash}): {} not found", .path.display())]
    MissingPart {
        ordinal: u64,
        hash: String,
        path: PathBuf,
    },

    #[error("part #{ordinal} is corrupt: expected {expected}, got {actual}")]
    Corrupt {
        ordinal: u64,
        expected: String,
        actual: String,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl PartError {
    /// Wrap an I/O error for `path`; `ErrorKind::NotFound` becomes `PartError::NotFound`.
    pub fn from_io(source: io::Error, context: &str, path: &Path) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            return PartError::NotFound {
                path: path.to_path_buf(),
            };
        }
        PartError::Io {
            context: format!("{} {}", context, path.display()),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PartError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, PartError>;

/// Attach a context string and path to an `io::Result`, like `anyhow::Context` does for
/// the binary.
pub(crate) trait IoContext<T> {
    fn io_ctx(self, context: &str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_ctx(self, context: &str, path: &Path) -> Result<T> {
        self.map_err(|e| PartError::from_io(e, context, path))
    }
}
