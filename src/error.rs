//! Error types for the content-store filesystem.
//!
//! `StoreError` wraps failures from the metadata store or a content store
//! backend. `FsError` is the public error surfaced by tree operations.

use crate::types::{ContentTypeId, NodeId, OwnerId, StoreId};
use thiserror::Error;

/// Persistence failure from a metadata or content store backend.
///
/// Always wraps the underlying transport or library error; backends never
/// swallow failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata store failure: {0}")]
    Sled(#[from] sled::Error),

    #[error("remote store transport failure: {0}")]
    Http(#[from] reqwest::Error),

    #[error("record codec failure: {0}")]
    Codec(#[from] bincode::Error),

    #[error("no content stored under {0:?}")]
    MissingContent(String),
}

/// Error surfaced by filesystem tree operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// Argument errors fail fast, before any mutation.
    #[error("invalid node name {0:?}")]
    InvalidName(String),

    #[error("name {name:?} already exists under {parent}")]
    DuplicateName { parent: NodeId, name: String },

    #[error("owner {0:?} already has a root")]
    RootExists(OwnerId),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("node {0} has been deleted")]
    NodeDeleted(NodeId),

    #[error("{0:?} is not a directory")]
    NotADirectory(String),

    #[error("{0:?} is not a file")]
    NotAFile(String),

    /// Retrieved content does not match the recorded fingerprint. Fatal for
    /// the retrieval; never retried transparently.
    #[error("checksum mismatch: recorded {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Configuration errors are raised at lookup time, not deferred.
    #[error("unknown content store {0:?}")]
    UnknownStore(StoreId),

    #[error("unknown content type {0:?}")]
    UnknownContentType(ContentTypeId),

    #[error("access denied: {0}")]
    Denied(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("local filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
