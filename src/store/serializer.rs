//! Local filesystem serializer: turns a file or directory subtree into blocks

use crate::error::StoreError;
use crate::store::block::Block;
use crate::store::check_cancelled;
use crate::types::Cid;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Summary of a serialized subtree
#[derive(Debug, Clone)]
pub struct Serialized {
    pub root: Cid,
    pub entries: usize,
    pub bytes: u64,
}

/// Serializer configuration
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Accept a directory root and descend into it
    pub recursive: bool,
    /// Log each serialized entry at info level
    pub progress: bool,
}

/// Walks a local subtree bottom-up without following symlinks.
///
/// Every produced block is handed to `sink` before its parent directory is built,
/// so a sink that persists blocks never sees a dangling link.
pub struct Serializer {
    root: PathBuf,
    config: SerializerConfig,
}

impl Serializer {
    pub fn new(root: PathBuf, config: SerializerConfig) -> Self {
        Self { root, config }
    }

    pub fn run<F>(&self, cancel: &CancellationToken, mut sink: F) -> Result<Serialized, StoreError>
    where
        F: FnMut(Cid, Block) -> Result<(), StoreError>,
    {
        let metadata = fs::symlink_metadata(&self.root)?;
        if metadata.is_dir() && !self.config.recursive {
            return Err(StoreError::NotRecursive(self.root.clone()));
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .follow_root_links(false)
            .contents_first(true)
            .sort_by_file_name();

        // pending[d] collects the finished children of the directory at depth d - 1
        let mut pending: Vec<Vec<(String, Cid)>> = Vec::new();
        let mut root = None;
        let mut entries = 0usize;
        let mut bytes = 0u64;

        for entry in walker {
            check_cancelled(cancel)?;
            let entry = entry.map_err(|e| {
                StoreError::IoError(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to walk {:?}: {}", self.root, e),
                ))
            })?;

            let depth = entry.depth();
            let name = match depth {
                0 => None,
                _ => Some(entry_name(&entry)?),
            };
            if pending.len() < depth + 2 {
                pending.resize_with(depth + 2, Vec::new);
            }

            let block = match self.block_for(&entry, &mut pending[depth + 1])? {
                Some(block) => block,
                None => continue,
            };
            if let Block::File { data } = &block {
                bytes += data.len() as u64;
            }

            let cid = block.cid();
            if self.config.progress {
                info!(path = %entry.path().display(), cid = %cid, bytes, "Added entry");
            } else {
                debug!(path = %entry.path().display(), cid = %cid, "Added entry");
            }
            sink(cid, block)?;
            entries += 1;

            match name {
                Some(name) => pending[depth].push((name, cid)),
                None => root = Some(cid),
            }
        }

        let root = root.ok_or_else(|| StoreError::NotFound(self.root.display().to_string()))?;
        Ok(Serialized {
            root,
            entries,
            bytes,
        })
    }

    fn block_for(
        &self,
        entry: &DirEntry,
        children: &mut Vec<(String, Cid)>,
    ) -> Result<Option<Block>, StoreError> {
        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = symlink_target(path)?;
            let target = target.into_os_string().into_string().map_err(|_| {
                StoreError::InvalidName {
                    path: path.to_path_buf(),
                    reason: "symlink target is not valid UTF-8".to_string(),
                }
            })?;
            Ok(Some(Block::Symlink { target }))
        } else if file_type.is_file() {
            Ok(Some(Block::File {
                data: fs::read(path)?,
            }))
        } else if file_type.is_dir() {
            let mut entries = std::mem::take(children);
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                return Err(StoreError::InvalidName {
                    path: path.join(&pair[0].0),
                    reason: "duplicate entry name".to_string(),
                });
            }
            Ok(Some(Block::Directory { entries }))
        } else {
            warn!(path = %path.display(), "Skipping special file");
            Ok(None)
        }
    }
}

/// Target of a symlink, made absolute against the link's own directory
fn symlink_target(link: &Path) -> Result<PathBuf, StoreError> {
    let target = fs::read_link(link)?;
    if target.is_absolute() {
        return Ok(target);
    }
    let parent = link.parent().unwrap_or_else(|| Path::new("."));
    let parent = dunce::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
    Ok(parent.join(target))
}

/// Entry name exactly as the filesystem reports it
fn entry_name(entry: &DirEntry) -> Result<String, StoreError> {
    entry
        .file_name()
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidName {
            path: entry.path().to_path_buf(),
            reason: "name is not valid UTF-8".to_string(),
        })
}
