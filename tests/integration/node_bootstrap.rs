//! Node startup, repository initialization and shutdown

use crate::integration::test_utils::write_tree;
use cafs::config::CacheConfig;
use cafs::error::FileTreeError;
use cafs::node::{FilesNode, NodeOptions, NodeType};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn private_cache(dir: &TempDir) -> CacheConfig {
    CacheConfig {
        db_path: dir.path().join("db"),
        shared: false,
    }
}

#[test]
fn test_ephemeral_node_publishes_and_resolves() {
    let temp_dir = TempDir::new().unwrap();
    let mut node = FilesNode::start(
        &NodeOptions::default(),
        &private_cache(&temp_dir),
        CancellationToken::new(),
    )
    .unwrap();

    let root = temp_dir.path().join("album");
    write_tree(&root, &[("cover.jpg", "jpeg")]);
    let added = node.files().add_path(&root).unwrap();

    let resolved = node.files().resolve_by_name("album").unwrap();
    assert_eq!(&resolved, added.logical_path());
    assert!(node.store().is_pinned(&added.address().hash).unwrap());
    assert_eq!(node.peers().len(), 0);

    node.shutdown();
    assert!(node.cache().is_closed());
    assert!(matches!(
        node.files().resolve_by_name("album"),
        Err(FileTreeError::Cancelled)
    ));
}

#[test]
fn test_default_node_reuses_repository() {
    let temp_dir = TempDir::new().unwrap();
    let options = NodeOptions {
        node_type: Some(NodeType::Default),
        repo_path: temp_dir.path().join("repo"),
        enable_experimental: true,
        bootstrap_peers: vec!["/ip4/10.0.0.1/tcp/4001/p2p/QmPeer".to_string()],
        ..NodeOptions::default()
    };
    let file = temp_dir.path().join("note.txt");
    std::fs::write(&file, "kept").unwrap();

    let hash = {
        let mut node =
            FilesNode::start(&options, &private_cache(&temp_dir), CancellationToken::new())
                .unwrap();
        assert!(node.repo_config().experimental.filestore);
        assert_eq!(node.peers()[0].peer_id, "QmPeer");
        let hash = node.files().add_path(&file).unwrap().address().hash;
        node.shutdown();
        hash
    };

    let plain = NodeOptions {
        enable_experimental: false,
        ..options
    };
    let mut node =
        FilesNode::start(&plain, &private_cache(&temp_dir), CancellationToken::new()).unwrap();
    assert!(node.repo_config().experimental.filestore);
    assert!(node.store().contains(&hash).unwrap());

    let mut reopened = node.files().open("note.txt").unwrap();
    assert_eq!(reopened.read().unwrap(), b"kept");
    node.shutdown();
}

#[test]
fn test_invalid_peer_fails_startup() {
    let temp_dir = TempDir::new().unwrap();
    let options = NodeOptions {
        bootstrap_peers: vec!["not-a-multiaddr".to_string()],
        ..NodeOptions::default()
    };
    assert!(matches!(
        FilesNode::start(&options, &private_cache(&temp_dir), CancellationToken::new()),
        Err(FileTreeError::Config(_))
    ));
}
