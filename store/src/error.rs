//! File store error types.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in the file store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this key already exists.
    #[error("record already exists: {}", path.display())]
    AlreadyExists { key: String, path: PathBuf },

    /// The collection directory does not exist yet.
    #[error("collection not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Key is empty or not a plain file name.
    #[error("invalid record key: {0:?}")]
    InvalidKey(String),

    /// Filesystem failure.
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Record could not be encoded.
    #[error("encoding JSON {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Stored file could not be decoded.
    #[error("decoding JSON {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Get error code for outer layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::AlreadyExists { .. } => "ALREADY_EXISTS",
            StoreError::NotFound { .. } => "NOT_FOUND",
            StoreError::InvalidKey(_) => "INVALID_KEY",
            StoreError::Io { .. } => "STORAGE_IO",
            StoreError::Encode { .. } => "STORAGE_ENCODE",
            StoreError::Decode { .. } => "STORAGE_DECODE",
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
