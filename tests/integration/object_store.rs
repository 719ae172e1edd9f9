//! Object store facade: publish, retrieve, pins and garbage collection

use crate::integration::test_utils::write_tree;
use cafs::error::StoreError;
use cafs::store::{AddOptions, ObjectNode, ObjectStore, SledObjectStore};
use cafs::types::DEFAULT_NAMESPACE;
use std::io::Read;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn unpinned() -> AddOptions {
    AddOptions {
        pin: false,
        ..AddOptions::default()
    }
}

#[test]
fn test_add_returns_rooted_address() {
    let store = SledObjectStore::temporary().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    write_tree(&root, &[("a.txt", "a")]);

    let address = store
        .add(&root, &AddOptions::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(address.namespace, DEFAULT_NAMESPACE);
    assert_eq!(address.root, Some(address.hash));
    assert!(store.is_pinned(&address.hash).unwrap());
}

#[test]
fn test_get_descends_through_directories() {
    let store = SledObjectStore::temporary().unwrap();
    let cancel = CancellationToken::new();
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    write_tree(&root, &[("a/b/c.txt", "deep")]);

    let address = store.add(&root, &AddOptions::default(), &cancel).unwrap();
    let fetched = store
        .get(&address.to_path().join("a/b/c.txt"), &cancel)
        .unwrap();
    match fetched.node {
        ObjectNode::File(mut handle) => {
            let mut text = String::new();
            handle.read_to_string(&mut text).unwrap();
            assert_eq!(text, "deep");
        }
        other => panic!("expected file, got {:?}", other),
    }

    let dir = store.get(&address.to_path().join("a"), &cancel).unwrap();
    match dir.node {
        ObjectNode::Directory(entries) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].name, "b");
        }
        other => panic!("expected directory, got {:?}", other),
    }
}

#[test]
fn test_directory_requires_recursive() {
    let store = SledObjectStore::temporary().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let options = AddOptions {
        recursive: false,
        ..AddOptions::default()
    };
    assert!(matches!(
        store.add(temp_dir.path(), &options, &CancellationToken::new()),
        Err(StoreError::NotRecursive(_))
    ));
}

#[test]
fn test_gc_keeps_pinned_and_drops_unpinned() {
    let store = SledObjectStore::temporary().unwrap();
    let cancel = CancellationToken::new();
    let temp_dir = TempDir::new().unwrap();
    let kept = temp_dir.path().join("kept");
    let dropped = temp_dir.path().join("dropped");
    write_tree(&kept, &[("k.txt", "keep me")]);
    write_tree(&dropped, &[("d.txt", "drop me")]);

    let kept_address = store.add(&kept, &AddOptions::default(), &cancel).unwrap();
    let dropped_address = store.add(&dropped, &unpinned(), &cancel).unwrap();

    let removed = store.gc(&cancel).unwrap();
    assert_eq!(removed, 2);
    assert!(store.contains(&kept_address.hash).unwrap());
    assert!(!store.contains(&dropped_address.hash).unwrap());
    assert!(store.get(&kept_address.to_path().join("k.txt"), &cancel).is_ok());

    assert!(store.unpin(&kept_address.hash).unwrap());
    assert_eq!(store.gc(&cancel).unwrap(), 2);
    assert_eq!(store.stats().blocks, 0);
}

#[test]
fn test_blocks_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("blocks");
    let file = temp_dir.path().join("note.txt");
    std::fs::write(&file, "persisted").unwrap();
    let cancel = CancellationToken::new();

    let address = {
        let store = SledObjectStore::open(&db).unwrap();
        let address = store.add(&file, &AddOptions::default(), &cancel).unwrap();
        store.flush().unwrap();
        address
    };

    let store = SledObjectStore::open(&db).unwrap();
    assert!(store.is_pinned(&address.hash).unwrap());
    assert!(store.get(&address.to_path(), &cancel).is_ok());
}
