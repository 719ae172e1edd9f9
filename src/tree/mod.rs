//! Content-addressed file tree
//!
//! A [`FileTreeNode`] is one file, directory or symlink reached through the object
//! store. Nodes are produced by [`FileTree`] and never shared: each owns its payload.

pub mod engine;
pub mod path;

pub use engine::FileTree;

use crate::error::FileTreeError;
use crate::store::{DirEntry, FileHandle, ObjectNode};
use crate::types::{ContentAddress, ContentPath};
use serde::Serialize;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::error;

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
    #[serde(rename = "symlink")]
    SymbolicLink,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
            NodeKind::SymbolicLink => "symlink",
        };
        f.write_str(name)
    }
}

enum Payload {
    File(FileHandle),
    Directory(Vec<DirEntry>),
    Symlink(PathBuf),
}

/// One entry of a content-addressed tree
pub struct FileTreeNode {
    name: String,
    address: ContentAddress,
    logical_path: ContentPath,
    payload: Payload,
}

impl FileTreeNode {
    /// Classify a fetched object into a node. Unknown kinds are rejected here so
    /// nothing downstream has to handle them.
    pub(crate) fn from_object(
        name: String,
        address: ContentAddress,
        logical_path: ContentPath,
        object: ObjectNode,
    ) -> Result<Self, FileTreeError> {
        let payload = match object {
            ObjectNode::File(handle) => Payload::File(handle),
            ObjectNode::Directory(entries) => Payload::Directory(entries),
            ObjectNode::Symlink { target } => Payload::Symlink(target),
            ObjectNode::Unsupported { kind } => {
                return Err(FileTreeError::UnsupportedType {
                    path: logical_path.to_string(),
                    kind,
                })
            }
        };
        Ok(Self {
            name,
            address,
            logical_path,
            payload,
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self.payload {
            Payload::File(_) => NodeKind::File,
            Payload::Directory(_) => NodeKind::Directory,
            Payload::Symlink(_) => NodeKind::SymbolicLink,
        }
    }

    /// Entry name within the parent; `/` for the tree root
    pub fn name(&self) -> &str {
        if self.name.is_empty() {
            "/"
        } else {
            &self.name
        }
    }

    pub fn address(&self) -> &ContentAddress {
        &self.address
    }

    pub fn logical_path(&self) -> &ContentPath {
        &self.logical_path
    }

    /// Local path the link pointed to at ingestion; `None` unless a symlink
    pub fn symlink_target(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Symlink(target) => Some(target),
            _ => None,
        }
    }

    /// Directory entries in storage order; empty unless a directory
    pub fn entries(&self) -> &[DirEntry] {
        match &self.payload {
            Payload::Directory(entries) => entries,
            _ => &[],
        }
    }

    /// Path relative to the ingested root, e.g. `/a/b.txt`
    pub fn path(&self) -> String {
        path::relative_path(&self.logical_path.to_string(), &self.address.prefix())
    }

    /// Full byte content
    ///
    /// Symlinks are read from their original local target, never from the store.
    pub fn read(&mut self) -> Result<Vec<u8>, FileTreeError> {
        let path = self.logical_path.to_string();
        match &mut self.payload {
            Payload::File(handle) => {
                let mut data = Vec::new();
                handle.read_to_end(&mut data).map_err(|source| {
                    error!(path = %path, "Error reading file content: {}", source);
                    FileTreeError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                *handle = Box::new(Cursor::new(data.clone()));
                Ok(data)
            }
            Payload::Symlink(target) => std::fs::read(&*target).map_err(|source| {
                error!(target = %target.display(), "Error reading original symlinked file: {}", source);
                FileTreeError::Read {
                    path: target.display().to_string(),
                    source,
                }
            }),
            Payload::Directory(_) => Err(FileTreeError::IsADirectory(path)),
        }
    }
}

impl fmt::Debug for FileTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTreeNode")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("address", &self.address)
            .field("logical_path", &self.logical_path.to_string())
            .field("symlink_target", &self.symlink_target())
            .finish()
    }
}
