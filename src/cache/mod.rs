//! Name Cache
//!
//! Durable mapping from a human-assigned name to the content path it was published
//! under. Keys are flat: only the final segment of a path-like name is used, so two
//! sources sharing a basename overwrite each other (last write wins).

pub mod persistence;

pub use persistence::SledNameCache;

use crate::error::StoreError;

/// Name Cache interface
pub trait NameCache: Send + Sync {
    /// Store or overwrite the mapping for `name`.
    fn put(&self, name: &str, address_path: &str) -> Result<(), StoreError>;

    /// Last stored mapping for `name`, if any.
    fn get(&self, name: &str) -> Result<Option<String>, StoreError>;
}

/// Cache key for a name: its final `/`-separated segment.
pub fn cache_key(name: &str) -> &str {
    let trimmed = name.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, last)) => last,
        None => trimmed,
    }
}
