//! Document store error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the document store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Identifier is not a well-formed document id
    #[error("Invalid _id: {0}")]
    InvalidId(String),

    /// A unique index rejected the write
    #[error("Duplicate value for unique field {field}: {value}")]
    DuplicateKey { field: String, value: String },

    /// Document is not a JSON object
    #[error("Document must be a JSON object")]
    NotAnObject,

    /// Database URL could not be understood
    #[error("Unsupported database url: {0}")]
    UnsupportedUrl(String),

    /// Snapshot checksum mismatch
    #[error("Snapshot {path} is corrupted: expected checksum {expected:08x}, got {actual:08x}")]
    Corruption {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },

    /// Snapshot could not be read or written
    #[error("Snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot contents are not valid JSON
    #[error("Snapshot {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Lock was poisoned by a panicking writer
    #[error("Collection lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is caused by the caller rather than the engine
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidId(_) | StoreError::DuplicateKey { .. } | StoreError::NotAnObject
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(StoreError::InvalidId("x".to_string()).is_client_error());
        assert!(StoreError::DuplicateKey {
            field: "name".to_string(),
            value: "a".to_string()
        }
        .is_client_error());
        assert!(!StoreError::LockPoisoned.is_client_error());
    }

    #[test]
    fn test_duplicate_key_message() {
        let err = StoreError::DuplicateKey {
            field: "name".to_string(),
            value: "The Forest Hiker".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate value for unique field name: The Forest Hiker"
        );
    }
}
