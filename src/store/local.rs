//! Sled-backed implementation of the object store

use crate::error::StoreError;
use crate::store::block::Block;
use crate::store::serializer::{Serializer, SerializerConfig};
use crate::store::{
    check_cancelled, AddOptions, DirEntry, FetchedObject, ObjectNode, ObjectStore,
};
use crate::types::{Cid, ContentAddress, ContentPath, DEFAULT_NAMESPACE};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const BLOCKS_TREE: &str = "blocks";
const PINS_TREE: &str = "pins";

/// Block and pin counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub blocks: usize,
    pub pins: usize,
}

/// Content-addressed block store kept in a sled database
pub struct SledObjectStore {
    db: sled::Db,
    blocks: sled::Tree,
    pins: sled::Tree,
}

impl SledObjectStore {
    /// Open (or create) a store in the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a store that is discarded when dropped
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let blocks = db.open_tree(BLOCKS_TREE)?;
        let pins = db.open_tree(PINS_TREE)?;
        Ok(Self { db, blocks, pins })
    }

    fn get_block(&self, cid: &Cid) -> Result<Block, StoreError> {
        match self.blocks.get(cid.as_bytes())? {
            Some(bytes) => Block::decode(cid, &bytes),
            None => Err(StoreError::NotFound(format!("block {}", cid))),
        }
    }

    /// Check if a block exists in the store
    pub fn contains(&self, cid: &Cid) -> Result<bool, StoreError> {
        Ok(self.blocks.contains_key(cid.as_bytes())?)
    }

    /// Protect `cid` and everything it links to from garbage collection
    pub fn pin(&self, cid: &Cid) -> Result<(), StoreError> {
        if !self.contains(cid)? {
            return Err(StoreError::NotFound(format!("block {}", cid)));
        }
        self.pins.insert(cid.as_bytes(), Vec::<u8>::new())?;
        debug!(cid = %cid, "Pinned");
        Ok(())
    }

    /// Returns whether a pin was removed
    pub fn unpin(&self, cid: &Cid) -> Result<bool, StoreError> {
        Ok(self.pins.remove(cid.as_bytes())?.is_some())
    }

    pub fn is_pinned(&self, cid: &Cid) -> Result<bool, StoreError> {
        Ok(self.pins.contains_key(cid.as_bytes())?)
    }

    pub fn pins(&self) -> Result<Vec<Cid>, StoreError> {
        self.pins
            .iter()
            .keys()
            .map(|key| -> Result<Cid, StoreError> {
                let key = key?;
                let bytes: [u8; 32] = key.as_ref().try_into().map_err(|_| StoreError::Corrupt {
                    cid: hex::encode(&key),
                    reason: "pin key is not 32 bytes".to_string(),
                })?;
                Ok(Cid::from_bytes(bytes))
            })
            .collect()
    }

    /// Remove every block not reachable from a pin. Returns the number removed.
    #[instrument(skip(self, cancel))]
    pub fn gc(&self, cancel: &CancellationToken) -> Result<usize, StoreError> {
        let start = Instant::now();
        let mut live: HashSet<Cid> = HashSet::new();
        let mut stack = self.pins()?;

        while let Some(cid) = stack.pop() {
            check_cancelled(cancel)?;
            if !live.insert(cid) {
                continue;
            }
            match self.get_block(&cid) {
                Ok(block) => stack.extend(block.links().copied()),
                Err(StoreError::NotFound(_)) => warn!(cid = %cid, "Pinned block is missing"),
                Err(e) => return Err(e),
            }
        }

        let mut batch = sled::Batch::default();
        let mut removed = 0usize;
        for key in self.blocks.iter().keys() {
            check_cancelled(cancel)?;
            let key = key?;
            let keep = <[u8; 32]>::try_from(key.as_ref())
                .map(|bytes| live.contains(&Cid::from_bytes(bytes)))
                .unwrap_or(false);
            if !keep {
                batch.remove(key);
                removed += 1;
            }
        }
        self.blocks.apply_batch(batch)?;

        info!(
            live = live.len(),
            removed,
            duration_ms = start.elapsed().as_millis(),
            "Garbage collection completed"
        );
        Ok(removed)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            blocks: self.blocks.len(),
            pins: self.pins.len(),
        }
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn into_node(block: Block) -> ObjectNode {
        match block {
            Block::File { data } => ObjectNode::File(Box::new(Cursor::new(data))),
            Block::Directory { entries } => ObjectNode::Directory(
                entries
                    .into_iter()
                    .map(|(name, cid)| DirEntry { name, cid })
                    .collect(),
            ),
            Block::Symlink { target } => ObjectNode::Symlink {
                target: PathBuf::from(target),
            },
        }
    }
}

impl ObjectStore for SledObjectStore {
    #[instrument(skip(self, local_path, options, cancel), fields(path = %local_path.display()))]
    fn add(
        &self,
        local_path: &Path,
        options: &AddOptions,
        cancel: &CancellationToken,
    ) -> Result<ContentAddress, StoreError> {
        check_cancelled(cancel)?;
        let start = Instant::now();

        let serializer = Serializer::new(
            local_path.to_path_buf(),
            SerializerConfig {
                recursive: options.recursive,
                progress: options.progress,
            },
        );

        let mut batch = sled::Batch::default();
        let summary = serializer.run(cancel, |cid, block| {
            batch.insert(&cid.as_bytes()[..], block.encode()?);
            Ok(())
        })?;
        check_cancelled(cancel)?;
        self.blocks.apply_batch(batch)?;

        if options.pin {
            self.pin(&summary.root)?;
        }

        info!(
            root = %summary.root,
            entries = summary.entries,
            bytes = summary.bytes,
            pinned = options.pin,
            duration_ms = start.elapsed().as_millis(),
            "Added to object store"
        );
        Ok(ContentAddress::rooted(summary.root))
    }

    fn get(
        &self,
        path: &ContentPath,
        cancel: &CancellationToken,
    ) -> Result<FetchedObject, StoreError> {
        check_cancelled(cancel)?;
        if path.namespace != DEFAULT_NAMESPACE {
            return Err(StoreError::InvalidPath(format!(
                "unknown namespace {:?} in {}",
                path.namespace, path
            )));
        }

        let mut cid = path.root;
        let mut block = self.get_block(&cid)?;
        for segment in &path.segments {
            check_cancelled(cancel)?;
            let entries = match &block {
                Block::Directory { entries } => entries,
                _ => {
                    return Err(StoreError::InvalidPath(format!(
                        "{} does not name a directory before {:?}",
                        path, segment
                    )))
                }
            };
            cid = entries
                .iter()
                .find(|(name, _)| name == segment)
                .map(|(_, child)| *child)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            block = self.get_block(&cid)?;
        }

        Ok(FetchedObject {
            cid,
            node: Self::into_node(block),
        })
    }
}
