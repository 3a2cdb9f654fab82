//! Crate-wide error type.
//!
//! Every subsystem returns [`Error`]; the server adapter maps variants to
//! HTTP status codes (dimension mismatches are caller errors, store
//! failures are internal errors, not-found variants are handled locally
//! by the retrieval engine).

use thiserror::Error;

/// Errors produced by the storage, index, and retrieval subsystems.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying file I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The vector file header is unusable (bad magic, short file, zero
    /// dimension). Non-recoverable: the operator must delete the file.
    #[error("invalid vectors file header: {0}")]
    InvalidHeader(String),

    /// A vector's length does not match the store's dimension.
    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A vector id past the end of the store.
    #[error("vector id out of range: {id} >= {count}")]
    VectorOutOfRange { id: u64, count: u64 },

    /// No document under the given id.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// No chunk under the given id.
    #[error("chunk not found: {0}")]
    ChunkNotFound(u64),

    /// Metadata store failure (transaction, table, or commit error).
    #[error("storage error: {0}")]
    Storage(String),

    /// A record failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redb::DatabaseError> for Error {
    fn from(e: redb::DatabaseError) -> Self {
        Error::Storage(e.to_string())
    }
}
impl From<redb::TransactionError> for Error {
    fn from(e: redb::TransactionError) -> Self {
        Error::Storage(e.to_string())
    }
}
impl From<redb::TableError> for Error {
    fn from(e: redb::TableError) -> Self {
        Error::Storage(e.to_string())
    }
}
impl From<redb::StorageError> for Error {
    fn from(e: redb::StorageError) -> Self {
        Error::Storage(e.to_string())
    }
}
impl From<redb::CommitError> for Error {
    fn from(e: redb::CommitError) -> Self {
        Error::Storage(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
