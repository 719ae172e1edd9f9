//! Core addressing types: content identifiers, content addresses and content paths.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace tag used for every address produced by this crate.
pub const DEFAULT_NAMESPACE: &str = "cas";

/// Hash type (BLAKE3 output)
pub type Hash = [u8; 32];

/// Content identifier: the BLAKE3 digest of an encoded block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cid(Hash);

impl Cid {
    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self.to_hex())
    }
}

impl FromStr for Cid {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| StoreError::InvalidPath(format!("invalid cid {:?}: {}", s, e)))?;
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| StoreError::InvalidPath(format!("cid {:?} is not 32 bytes", s)))?;
        Ok(Self(hash))
    }
}

/// Identity of a published object.
///
/// `root` is the address of the top-level object the node was reached from; it is
/// `None` for objects fetched directly by their own hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAddress {
    pub namespace: String,
    pub root: Option<Cid>,
    pub hash: Cid,
}

impl ContentAddress {
    /// Address of a freshly published top-level object.
    pub fn rooted(hash: Cid) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            root: Some(hash),
            hash,
        }
    }

    /// `/namespace/root`, or `/namespace/hash` when there is no root.
    pub fn prefix(&self) -> String {
        let anchor = self.root.unwrap_or(self.hash);
        format!("/{}/{}", self.namespace, anchor)
    }

    /// Canonical path addressing this object on its own.
    pub fn to_path(&self) -> ContentPath {
        ContentPath {
            namespace: self.namespace.clone(),
            root: self.hash,
            segments: Vec::new(),
        }
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.namespace, self.hash)
    }
}

/// A path inside the content-addressed namespace: `/namespace/root/seg/seg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentPath {
    pub namespace: String,
    pub root: Cid,
    pub segments: Vec<String>,
}

impl ContentPath {
    pub fn new(root: Cid) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            root,
            segments: Vec::new(),
        }
    }

    /// Child path one level below this one. Empty or `/`-separated names are split.
    pub fn join(&self, name: &str) -> Self {
        let mut child = self.clone();
        child
            .segments
            .extend(name.split('/').filter(|s| !s.is_empty()).map(str::to_string));
        child
    }

    /// True when the path names a top-level object.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `s` looks like a content path rather than a cache name.
    pub fn looks_like(s: &str) -> bool {
        s.parse::<ContentPath>().is_ok()
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.namespace, self.root)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for ContentPath {
    type Err = StoreError;

    /// Accepts `/ns/<cid>[/rest]` or a bare `<cid>[/rest]` in the default namespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').filter(|p| !p.is_empty()).collect();
        let (namespace, root, rest) = match parts.as_slice() {
            [] => return Err(StoreError::InvalidPath("empty content path".to_string())),
            [first, rest @ ..] if !s.starts_with('/') => (DEFAULT_NAMESPACE, *first, rest),
            [ns, root, rest @ ..] => (*ns, *root, rest),
            [_] => {
                return Err(StoreError::InvalidPath(format!(
                    "content path {:?} has no root",
                    s
                )))
            }
        };
        Ok(Self {
            namespace: namespace.to_string(),
            root: root.parse()?,
            segments: rest.iter().map(|p| p.to_string()).collect(),
        })
    }
}
