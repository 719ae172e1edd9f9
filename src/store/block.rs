//! Block encoding and cid computation using BLAKE3

use crate::error::StoreError;
use crate::types::Cid;
use blake3::Hasher;
use serde::{Deserialize, Serialize};

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    File { data: Vec<u8> },
    /// Children sorted by name
    Directory { entries: Vec<(String, Cid)> },
    Symlink { target: String },
}

impl Block {
    /// Compute the cid of this block
    ///
    /// cid = hash(kind || field lengths || fields), so blocks of different kinds
    /// never share a cid even when their payload bytes coincide.
    pub fn cid(&self) -> Cid {
        let mut hasher = Hasher::new();
        match self {
            Block::File { data } => {
                hasher.update(b"file");
                hasher.update(&(data.len() as u64).to_be_bytes());
                hasher.update(data);
            }
            Block::Directory { entries } => {
                hasher.update(b"directory");
                hasher.update(&(entries.len() as u64).to_be_bytes());
                for (name, cid) in entries {
                    hasher.update(&(name.len() as u64).to_be_bytes());
                    hasher.update(name.as_bytes());
                    hasher.update(cid.as_bytes());
                }
            }
            Block::Symlink { target } => {
                hasher.update(b"symlink");
                hasher.update(&(target.len() as u64).to_be_bytes());
                hasher.update(target.as_bytes());
            }
        }
        Cid::from_bytes(*hasher.finalize().as_bytes())
    }

    /// Cids this block links to
    pub fn links(&self) -> impl Iterator<Item = &Cid> {
        let entries: &[(String, Cid)] = match self {
            Block::Directory { entries } => entries,
            _ => &[],
        };
        entries.iter().map(|(_, cid)| cid)
    }

    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(self).map_err(|e| StoreError::Corrupt {
            cid: self.cid().to_hex(),
            reason: format!("failed to encode block: {}", e),
        })
    }

    pub fn decode(cid: &Cid, bytes: &[u8]) -> Result<Self, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Corrupt {
            cid: cid.to_hex(),
            reason: format!("failed to decode block: {}", e),
        })
    }
}
