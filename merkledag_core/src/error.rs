//! Error types for merkledag_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using merkledag_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, storing, or reading a DAG.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Stored bytes do not match what their address promises.
    #[error("Corrupted object at {location}: {reason}")]
    CorruptedObject { location: String, reason: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Object not found in store.
    #[error("Object not found: {hash}")]
    ObjectNotFound { hash: String },

    /// Store is invalid or not initialized.
    #[error("Invalid store at {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },

    /// Serialized object could not be decoded.
    #[error("Invalid object: {reason}")]
    InvalidObject { reason: String },

    /// Invalid object type.
    #[error("Invalid object type: expected {expected}, got {got}")]
    InvalidObjectType { expected: String, got: String },

    /// Link name or shape is not allowed.
    #[error("Invalid link: {reason}")]
    InvalidLink { reason: String },

    /// Path already exists (for materialization).
    #[error("Path already exists: {path}")]
    PathExists { path: PathBuf },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// The store was created with a different algorithm than the hasher.
    #[error("Algorithm mismatch: store uses {store}, hasher uses {hasher}")]
    AlgorithmMismatch { store: String, hasher: String },

    /// Configuration could not be parsed or is out of range.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Compression or decompression failed.
    #[error("Compression error: {reason}")]
    Compression { reason: String },

    /// A key-value backend reported a failure of its own.
    #[error("Store backend error: {reason}")]
    Backend { reason: String },
}

impl Error {
    /// Create a CorruptedObject error.
    pub fn corrupted_object(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptedObject {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an ObjectNotFound error.
    pub fn object_not_found(hash: impl Into<String>) -> Self {
        Error::ObjectNotFound { hash: hash.into() }
    }

    /// Create an InvalidStore error.
    pub fn invalid_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidObject error.
    pub fn invalid_object(reason: impl Into<String>) -> Self {
        Error::InvalidObject {
            reason: reason.into(),
        }
    }

    /// Create an InvalidObjectType error.
    pub fn invalid_object_type(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::InvalidObjectType {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an InvalidLink error.
    pub fn invalid_link(reason: impl Into<String>) -> Self {
        Error::InvalidLink {
            reason: reason.into(),
        }
    }

    /// Create a PathExists error.
    pub fn path_exists(path: impl Into<PathBuf>) -> Self {
        Error::PathExists { path: path.into() }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create an AlgorithmMismatch error.
    pub fn algorithm_mismatch(store: impl Into<String>, hasher: impl Into<String>) -> Self {
        Error::AlgorithmMismatch {
            store: store.into(),
            hasher: hasher.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a Compression error.
    pub fn compression_error(reason: impl Into<String>) -> Self {
        Error::Compression {
            reason: reason.into(),
        }
    }

    /// Create a Backend error.
    pub fn backend(reason: impl Into<String>) -> Self {
        Error::Backend {
            reason: reason.into(),
        }
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
