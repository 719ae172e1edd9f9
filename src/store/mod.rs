//! Object Store
//!
//! The content-addressed publish/retrieve capability the file tree is built on.
//! [`ObjectStore`] is the seam; [`SledObjectStore`] is the local implementation.

pub mod block;
pub mod local;
pub mod serializer;

pub use local::{SledObjectStore, StoreStats};

use crate::error::StoreError;
use crate::types::{Cid, ContentAddress, ContentPath};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Options for publishing a local path
#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Protect the published root from garbage collection
    pub pin: bool,
    /// Emit per-entry progress events
    pub progress: bool,
    /// Allow directories (and descend into them)
    pub recursive: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            pin: true,
            progress: true,
            recursive: true,
        }
    }
}

/// One entry of a fetched directory, in storage order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub cid: Cid,
}

/// Byte-stream handle for a fetched file
pub type FileHandle = Box<dyn Read + Send>;

/// A fetched object, classified once right after retrieval.
pub enum ObjectNode {
    File(FileHandle),
    Directory(Vec<DirEntry>),
    Symlink { target: PathBuf },
    /// Any object kind the file layer does not understand
    Unsupported { kind: String },
}

impl ObjectNode {
    pub fn kind_name(&self) -> &str {
        match self {
            ObjectNode::File(_) => "file",
            ObjectNode::Directory(_) => "directory",
            ObjectNode::Symlink { .. } => "symlink",
            ObjectNode::Unsupported { kind } => kind,
        }
    }
}

impl fmt::Debug for ObjectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectNode::File(_) => f.write_str("File(..)"),
            ObjectNode::Directory(entries) => f.debug_tuple("Directory").field(entries).finish(),
            ObjectNode::Symlink { target } => {
                f.debug_struct("Symlink").field("target", target).finish()
            }
            ObjectNode::Unsupported { kind } => {
                f.debug_struct("Unsupported").field("kind", kind).finish()
            }
        }
    }
}

/// Object fetched by path, with the cid it resolved to
#[derive(Debug)]
pub struct FetchedObject {
    pub cid: Cid,
    pub node: ObjectNode,
}

/// Object Store facade
///
/// Every call observes `cancel` and fails with [`StoreError::Cancelled`] once it fires.
pub trait ObjectStore: Send + Sync {
    /// Serialize and publish a local file or directory tree.
    fn add(
        &self,
        local_path: &Path,
        options: &AddOptions,
        cancel: &CancellationToken,
    ) -> Result<ContentAddress, StoreError>;

    /// Fetch the object at `path`, resolving path segments through directories.
    fn get(&self, path: &ContentPath, cancel: &CancellationToken)
        -> Result<FetchedObject, StoreError>;
}

pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<(), StoreError> {
    if cancel.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}
