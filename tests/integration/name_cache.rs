//! Name cache persistence and shutdown

use cafs::cache::{NameCache, SledNameCache};
use cafs::error::StoreError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn wait_until_closed(cache: &SledNameCache) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cache.is_closed() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_names_persist_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");
    let cancel = CancellationToken::new();

    let cache = SledNameCache::open(&path, &cancel).unwrap();
    cache.put("/home/me/photos", "/cas/abc").unwrap();
    cache.close();
    drop(cache);

    let reopened = SledNameCache::open(&path, &cancel).unwrap();
    assert_eq!(reopened.get("photos").unwrap().as_deref(), Some("/cas/abc"));
    assert_eq!(reopened.len(), 1);
}

#[test]
fn test_cancellation_closes_cache() {
    let temp_dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let cache = SledNameCache::open(temp_dir.path().join("db"), &cancel).unwrap();
    cache.put("a", "/cas/a").unwrap();

    cancel.cancel();
    assert!(wait_until_closed(&cache));
    assert!(matches!(cache.get("a"), Err(StoreError::Cancelled)));
}

#[test]
fn test_shared_instance_is_reused() {
    let temp_dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();

    let first = SledNameCache::shared(temp_dir.path().join("first"), &cancel).unwrap();
    let second = SledNameCache::shared(temp_dir.path().join("second"), &cancel).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.path(), temp_dir.path().join("first"));

    first.put("/srv/site", "/cas/site").unwrap();
    assert_eq!(second.get("site").unwrap().as_deref(), Some("/cas/site"));
}
