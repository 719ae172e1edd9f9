//! Error types for the content-addressed file layer.

use std::path::PathBuf;
use thiserror::Error;

/// Storage-related errors (object store and name cache)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid content path: {0}")]
    InvalidPath(String),

    #[error("Cannot store {path:?}: {reason}")]
    InvalidName { path: PathBuf, reason: String },

    #[error("{0:?} is a directory; add it recursively")]
    NotRecursive(PathBuf),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt block {cid}: {reason}")]
    Corrupt { cid: String, reason: String },

    #[error("Store is closed")]
    Closed,

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Errors surfaced by the file tree API
#[derive(Debug, Error)]
pub enum FileTreeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported object type {kind} at {path}")]
    UnsupportedType { path: String, kind: String },

    #[error("Failed to ingest {path:?}: {source}")]
    Ingestion {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is a directory")]
    IsADirectory(String),

    #[error("Failed to cache name {name}: {source}")]
    CacheWrite {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for FileTreeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => FileTreeError::NotFound(what),
            StoreError::Cancelled => FileTreeError::Cancelled,
            other => FileTreeError::Store(other),
        }
    }
}

impl From<config::ConfigError> for FileTreeError {
    fn from(err: config::ConfigError) -> Self {
        FileTreeError::Config(err.to_string())
    }
}
