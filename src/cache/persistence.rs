//! Persistence layer for the Name Cache

use crate::cache::{cache_key, NameCache};
use crate::error::StoreError;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

static SHARED: OnceLock<Arc<SledNameCache>> = OnceLock::new();
static SHARED_INIT: Mutex<()> = parking_lot::const_mutex(());

/// Sled-based implementation of NameCache
///
/// The database is closed exactly once: when the cancellation token it was opened
/// with fires, when [`SledNameCache::close`] is called, or when the last handle drops.
pub struct SledNameCache {
    db: RwLock<Option<sled::Db>>,
    path: PathBuf,
    cancel: CancellationToken,
    shutdown: CancellationToken,
}

impl SledNameCache {
    /// Open the cache at `path` and close it when `cancel` fires
    pub fn open<P: AsRef<Path>>(
        path: P,
        cancel: &CancellationToken,
    ) -> Result<Arc<Self>, StoreError> {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "Opening name cache");
        let db = sled::open(&path).map_err(|e| {
            error!(path = %path.display(), "Failed to open name cache: {}", e);
            StoreError::from(e)
        })?;

        let cache = Arc::new(Self {
            db: RwLock::new(Some(db)),
            path,
            cancel: cancel.clone(),
            shutdown: cancel.child_token(),
        });
        Self::watch_shutdown(Arc::downgrade(&cache), cache.shutdown.clone())?;
        Ok(cache)
    }

    /// Process-wide instance, opened on first use
    ///
    /// Later calls return the first instance regardless of `path`.
    pub fn shared<P: AsRef<Path>>(
        path: P,
        cancel: &CancellationToken,
    ) -> Result<Arc<Self>, StoreError> {
        if let Some(cache) = SHARED.get() {
            return Ok(Arc::clone(cache));
        }
        let _guard = SHARED_INIT.lock();
        if let Some(cache) = SHARED.get() {
            return Ok(Arc::clone(cache));
        }
        let cache = Self::open(path, cancel)?;
        let _ = SHARED.set(Arc::clone(&cache));
        Ok(cache)
    }

    fn watch_shutdown(cache: Weak<Self>, shutdown: CancellationToken) -> Result<(), StoreError> {
        thread::Builder::new()
            .name("name-cache-shutdown".to_string())
            .spawn(move || {
                futures::executor::block_on(shutdown.cancelled());
                if let Some(cache) = cache.upgrade() {
                    cache.close_db();
                }
            })?;
        Ok(())
    }

    /// Close the cache. Safe to call more than once.
    pub fn close(&self) {
        self.shutdown.cancel();
        self.close_db();
    }

    pub fn is_closed(&self) -> bool {
        self.db.read().is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of cached names
    pub fn len(&self) -> usize {
        self.db.read().as_ref().map(|db| db.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn close_db(&self) -> bool {
        let Some(db) = self.db.write().take() else {
            return false;
        };
        if let Err(e) = db.flush() {
            error!(path = %self.path.display(), "Failed to flush name cache: {}", e);
        }
        info!(path = %self.path.display(), "Name cache closed");
        true
    }

    fn closed_error(&self) -> StoreError {
        if self.cancel.is_cancelled() {
            StoreError::Cancelled
        } else {
            StoreError::Closed
        }
    }
}

impl NameCache for SledNameCache {
    fn put(&self, name: &str, address_path: &str) -> Result<(), StoreError> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or_else(|| self.closed_error())?;
        let key = cache_key(name);
        db.insert(key.as_bytes(), address_path.as_bytes())?;
        db.flush()?;
        debug!(key, address_path, "Cached name");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or_else(|| self.closed_error())?;
        let key = cache_key(name);
        match db.get(key.as_bytes())? {
            Some(value) => String::from_utf8(value.to_vec())
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    cid: key.to_string(),
                    reason: format!("cached address is not UTF-8: {}", e),
                }),
            None => Ok(None),
        }
    }
}

impl Drop for SledNameCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.close_db();
    }
}
