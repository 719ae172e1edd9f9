//! File tree engine: ingestion, resolution and traversal

use crate::cache::{cache_key, NameCache};
use crate::error::{FileTreeError, StoreError};
use crate::store::{AddOptions, ObjectStore};
use crate::tree::FileTreeNode;
use crate::tree::NodeKind;
use crate::types::{ContentAddress, ContentPath};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Builds and walks content-addressed trees
///
/// Every store and cache call observes the engine's cancellation token.
#[derive(Clone)]
pub struct FileTree {
    store: Arc<dyn ObjectStore>,
    cache: Arc<dyn NameCache>,
    cancel: CancellationToken,
}

impl FileTree {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        cache: Arc<dyn NameCache>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            cache,
            cancel,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn ensure_live(&self) -> Result<(), FileTreeError> {
        if self.cancel.is_cancelled() {
            Err(FileTreeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Publish a local file or directory, pinned, and cache it under its basename.
    ///
    /// A failed cache write is logged and does not fail the call.
    #[instrument(skip(self, local_path), fields(path = %local_path.display()))]
    pub fn add_path(&self, local_path: &Path) -> Result<FileTreeNode, FileTreeError> {
        self.ensure_live()?;
        if let Err(source) = std::fs::symlink_metadata(local_path) {
            return Err(if source.kind() == ErrorKind::NotFound {
                FileTreeError::NotFound(local_path.display().to_string())
            } else {
                FileTreeError::Io {
                    path: local_path.to_path_buf(),
                    source,
                }
            });
        }

        let address = self
            .store
            .add(local_path, &AddOptions::default(), &self.cancel)
            .map_err(|source| match source {
                StoreError::Cancelled => FileTreeError::Cancelled,
                source => {
                    error!("Could not add {}: {}", local_path.display(), source);
                    FileTreeError::Ingestion {
                        path: local_path.to_path_buf(),
                        source,
                    }
                }
            })?;

        let logical_path = address.to_path();
        self.register(local_path, &logical_path);
        self.fetch(String::new(), &address, &logical_path)
    }

    fn register(&self, local_path: &Path, logical_path: &ContentPath) {
        let name = local_path.to_string_lossy();
        let address = logical_path.to_string();
        match self.cache.put(&name, &address) {
            Ok(()) => info!(key = cache_key(&name), address = %address, "Cached content path"),
            Err(source) => {
                let failure = FileTreeError::CacheWrite {
                    name: name.to_string(),
                    source,
                };
                warn!("{}", failure);
            }
        }
    }

    /// Content path previously cached under `name`
    pub fn resolve_by_name(&self, name: &str) -> Result<ContentPath, FileTreeError> {
        self.ensure_live()?;
        let cached = self.cache.get(name)?.ok_or_else(|| {
            warn!(name, "Path for name not found");
            FileTreeError::NotFound(name.to_string())
        })?;
        cached.parse().map_err(FileTreeError::Store)
    }

    /// Fetch the node at a content path
    #[instrument(skip(self, path), fields(path = %path))]
    pub fn get(&self, path: &ContentPath) -> Result<FileTreeNode, FileTreeError> {
        let name = path.segments.last().cloned().unwrap_or_default();
        let address = ContentAddress {
            namespace: path.namespace.clone(),
            root: Some(path.root),
            hash: path.root,
        };
        self.fetch(name, &address, path)
    }

    /// Fetch by content path or cached name.
    ///
    /// A target starting with `/` is a content path when it parses as one. Any
    /// other target is looked up in the cache first, so a name that looks like a
    /// bare cid still resolves; only when no name matches is it read as a cid.
    pub fn open(&self, target: &str) -> Result<FileTreeNode, FileTreeError> {
        if target.starts_with('/') {
            let path = match target.parse::<ContentPath>() {
                Ok(path) => path,
                Err(_) => self.resolve_by_name(target)?,
            };
            return self.get(&path);
        }

        let path = match self.resolve_by_name(target) {
            Ok(path) => path,
            Err(FileTreeError::NotFound(_)) => target
                .parse::<ContentPath>()
                .map_err(|_| FileTreeError::NotFound(target.to_string()))?,
            Err(e) => return Err(e),
        };
        self.get(&path)
    }

    /// Fetch one node. `parent` supplies the namespace and root the node inherits.
    fn fetch(
        &self,
        name: String,
        parent: &ContentAddress,
        logical_path: &ContentPath,
    ) -> Result<FileTreeNode, FileTreeError> {
        let fetched = self.store.get(logical_path, &self.cancel).map_err(|e| {
            error!(path = %logical_path, "Could not get object: {}", e);
            FileTreeError::from(e)
        })?;
        let address = ContentAddress {
            namespace: parent.namespace.clone(),
            root: Some(parent.root.unwrap_or(parent.hash)),
            hash: fetched.cid,
        };
        FileTreeNode::from_object(name, address, logical_path.clone(), fetched.node)
    }

    /// Depth-first, pre-order walk below (and including) `root`.
    ///
    /// Each node is fetched when reached. Directories are visited before their
    /// entries, entries in storage order. The first error from `visit` or from a
    /// fetch aborts the whole walk.
    pub fn walk<F, E>(&self, root: &FileTreeNode, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut FileTreeNode) -> Result<(), E>,
        E: From<FileTreeError>,
    {
        debug!(root = %root.logical_path, "Walking tree");
        self.walk_node(root.name.clone(), &root.address, &root.logical_path, visit)
    }

    fn walk_node<F, E>(
        &self,
        name: String,
        parent: &ContentAddress,
        logical_path: &ContentPath,
        visit: &mut F,
    ) -> Result<(), E>
    where
        F: FnMut(&mut FileTreeNode) -> Result<(), E>,
        E: From<FileTreeError>,
    {
        self.ensure_live()?;
        let mut current = self.fetch(name, parent, logical_path)?;

        match current.kind() {
            NodeKind::File | NodeKind::SymbolicLink => visit(&mut current),
            NodeKind::Directory => {
                visit(&mut current)?;
                for entry in current.entries() {
                    let child_path = logical_path.join(&entry.name);
                    self.walk_node(entry.name.clone(), current.address(), &child_path, visit)?;
                }
                Ok(())
            }
        }
    }
}
