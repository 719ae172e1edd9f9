//! Node bootstrap
//!
//! Brings up a local object store repository, the name cache and a [`FileTree`]
//! bound to one cancellation token. A default node reuses (or creates) the
//! repository at `repo_path`; an ephemeral node lives in a temporary directory.

use crate::cache::{NameCache, SledNameCache};
use crate::config::{default_repo_path, expand_home, CacheConfig};
use crate::error::FileTreeError;
use crate::store::{ObjectStore, SledObjectStore};
use crate::tree::FileTree;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const REPO_CONFIG_FILE: &str = "config.toml";
const SWARM_KEY_FILE: &str = "swarm.key";
const BLOCKS_DIR: &str = "blocks";
const DIAGNOSTICS_DELAY: Duration = Duration::from_secs(10);
const DIAGNOSTICS_POLL: Duration = Duration::from_millis(100);

/// Repository mode. An unset mode starts an ephemeral node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Reuse the repository at `repo_path`, creating it when missing
    Default,
    /// Disposable repository removed when the node drops
    #[default]
    Ephemeral,
}

/// Private swarm settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmOptions {
    pub private: bool,
    /// Pre-shared key, 64 hex characters
    pub key: String,
}

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOptions {
    #[serde(default)]
    pub node_type: Option<NodeType>,

    #[serde(default = "default_repo_path")]
    pub repo_path: PathBuf,

    /// Multiaddr-style peer addresses, e.g. `/ip4/10.0.0.1/tcp/4001/p2p/<id>`
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    #[serde(default)]
    pub enable_experimental: bool,

    #[serde(default)]
    pub swarm: Option<SwarmOptions>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            node_type: None,
            repo_path: default_repo_path(),
            bootstrap_peers: Vec::new(),
            enable_experimental: false,
            swarm: None,
        }
    }
}

/// A bootstrap peer and every transport address given for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapPeer {
    pub peer_id: String,
    pub addrs: Vec<String>,
}

/// Parse peer addresses, merging addresses that name the same peer.
pub fn parse_bootstrap_peers(addrs: &[String]) -> Result<Vec<BootstrapPeer>, String> {
    let mut peers: Vec<BootstrapPeer> = Vec::new();
    for addr in addrs {
        let (transport, peer_id) = parse_peer_addr(addr)?;
        match peers.iter_mut().find(|p| p.peer_id == peer_id) {
            Some(peer) => peer.addrs.push(transport),
            None => peers.push(BootstrapPeer {
                peer_id,
                addrs: vec![transport],
            }),
        }
    }
    Ok(peers)
}

fn parse_peer_addr(addr: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = addr.split('/').collect();
    let [empty, proto, host, transport, port, p2p, peer_id] = parts.as_slice() else {
        return Err(format!("{:?} is not /<proto>/<host>/<tcp|udp>/<port>/p2p/<peer-id>", addr));
    };
    if !empty.is_empty() {
        return Err(format!("{:?} must start with '/'", addr));
    }
    let host_ok = match *proto {
        "ip4" => host.parse::<Ipv4Addr>().is_ok(),
        "ip6" => host.parse::<Ipv6Addr>().is_ok(),
        "dns" | "dns4" | "dns6" => !host.is_empty(),
        _ => return Err(format!("unsupported protocol {:?} in {:?}", proto, addr)),
    };
    if !host_ok {
        return Err(format!("invalid host {:?} in {:?}", host, addr));
    }
    if !matches!(*transport, "tcp" | "udp") {
        return Err(format!("unsupported transport {:?} in {:?}", transport, addr));
    }
    port.parse::<u16>()
        .map_err(|_| format!("invalid port {:?} in {:?}", port, addr))?;
    if !matches!(*p2p, "p2p" | "ipfs") || peer_id.is_empty() {
        return Err(format!("missing peer id in {:?}", addr));
    }
    Ok((
        format!("/{}/{}/{}/{}", proto, host, transport, port),
        peer_id.to_string(),
    ))
}

/// Pre-shared keys are 32 bytes written as hex
pub fn validate_swarm_key(key: &str) -> Result<(), String> {
    let bytes = hex::decode(key.trim()).map_err(|e| format!("not hex: {}", e))?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    Ok(())
}

/// Experimental features recorded in the repository config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentalFeatures {
    pub filestore: bool,
    pub urlstore: bool,
    pub sharding: bool,
    pub p2p_stream_mounting: bool,
    pub p2p_http_proxy: bool,
    pub strategic_providing: bool,
}

impl ExperimentalFeatures {
    fn all() -> Self {
        Self {
            filestore: true,
            urlstore: true,
            sharding: true,
            p2p_stream_mounting: true,
            p2p_http_proxy: true,
            strategic_providing: true,
        }
    }
}

/// Persistent repository configuration, written once at init
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub bootstrap: Vec<String>,
    #[serde(default)]
    pub experimental: ExperimentalFeatures,
    #[serde(default)]
    pub private_swarm: bool,
}

fn io_error(path: &Path, source: std::io::Error) -> FileTreeError {
    FileTreeError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Load the repository config at `repo`, initializing the repository if needed
pub fn init_repo(repo: &Path, options: &NodeOptions) -> Result<RepoConfig, FileTreeError> {
    let config_path = repo.join(REPO_CONFIG_FILE);
    if config_path.exists() {
        let text = fs::read_to_string(&config_path).map_err(|e| io_error(&config_path, e))?;
        return toml::from_str(&text).map_err(|e| {
            FileTreeError::Config(format!("invalid repository config {:?}: {}", config_path, e))
        });
    }

    info!(repo = %repo.display(), "Initializing repository");
    fs::create_dir_all(repo).map_err(|e| io_error(repo, e))?;

    let private_swarm = options.swarm.as_ref().map(|s| s.private).unwrap_or(false);
    if private_swarm {
        let key = options.swarm.as_ref().map(|s| s.key.trim()).unwrap_or_default();
        validate_swarm_key(key).map_err(|e| FileTreeError::Config(format!("swarm key: {}", e)))?;
        let key_path = repo.join(SWARM_KEY_FILE);
        fs::write(&key_path, format!("/key/swarm/psk/1.0.0/\n/base16/\n{}\n", key))
            .map_err(|e| io_error(&key_path, e))?;
    }

    let config = RepoConfig {
        bootstrap: options.bootstrap_peers.clone(),
        experimental: if options.enable_experimental {
            ExperimentalFeatures::all()
        } else {
            ExperimentalFeatures::default()
        },
        private_swarm,
    };
    let text = toml::to_string_pretty(&config)
        .map_err(|e| FileTreeError::Config(format!("failed to encode repository config: {}", e)))?;
    fs::write(&config_path, text).map_err(|e| io_error(&config_path, e))?;
    Ok(config)
}

/// A running node: store, name cache and file tree sharing one cancellation token
pub struct FilesNode {
    store: Arc<SledObjectStore>,
    cache: Arc<SledNameCache>,
    files: FileTree,
    // Child of the caller's token, cancelled when the node stops
    cancel: CancellationToken,
    repo_path: PathBuf,
    repo_config: RepoConfig,
    peers: Vec<BootstrapPeer>,
    diagnostics: Option<JoinHandle<()>>,
    // Dropped last so the store is closed before its directory is removed
    _ephemeral_repo: Option<TempDir>,
}

impl FilesNode {
    pub fn start(
        options: &NodeOptions,
        cache_config: &CacheConfig,
        cancel: CancellationToken,
    ) -> Result<Self, FileTreeError> {
        let node_type = options.node_type.unwrap_or_default();
        info!(node_type = ?node_type, "Starting node");
        let cancel = cancel.child_token();
        let peers = parse_bootstrap_peers(&options.bootstrap_peers).map_err(FileTreeError::Config)?;

        let (repo_path, ephemeral_repo) = match node_type {
            NodeType::Default => (expand_home(&options.repo_path), None),
            NodeType::Ephemeral => {
                let dir = tempfile::Builder::new()
                    .prefix("cafs-repo")
                    .tempdir()
                    .map_err(|e| io_error(&std::env::temp_dir(), e))?;
                (dir.path().to_path_buf(), Some(dir))
            }
        };

        let repo_config = init_repo(&repo_path, options).map_err(|e| {
            error!(repo = %repo_path.display(), "Failed to initialize repository: {}", e);
            e
        })?;
        let store = Arc::new(SledObjectStore::open(repo_path.join(BLOCKS_DIR))?);

        let db_path = expand_home(&cache_config.db_path);
        let cache = if cache_config.shared {
            SledNameCache::shared(&db_path, &cancel)?
        } else {
            SledNameCache::open(&db_path, &cancel)?
        };

        let files = FileTree::new(
            Arc::clone(&store) as Arc<dyn ObjectStore>,
            Arc::clone(&cache) as Arc<dyn NameCache>,
            cancel.clone(),
        );

        let diagnostics = spawn_diagnostics(Arc::clone(&store), peers.clone(), cancel.clone())
            .map_err(|e| {
                warn!("Failed to start diagnostics: {}", e);
                e
            })
            .ok();

        info!(repo = %repo_path.display(), peers = peers.len(), "Node is running");
        Ok(Self {
            store,
            cache,
            files,
            cancel,
            repo_path,
            repo_config,
            peers,
            diagnostics,
            _ephemeral_repo: ephemeral_repo,
        })
    }

    pub fn files(&self) -> &FileTree {
        &self.files
    }

    pub fn store(&self) -> &Arc<SledObjectStore> {
        &self.store
    }

    pub fn cache(&self) -> &SledNameCache {
        &self.cache
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn repo_config(&self) -> &RepoConfig {
        &self.repo_config
    }

    pub fn peers(&self) -> &[BootstrapPeer] {
        &self.peers
    }

    /// Cancel in-flight work, close the name cache and flush the store
    pub fn shutdown(&mut self) {
        info!("Shutting down node");
        self.stop();
        self.cache.close();
    }

    /// Idempotent: cancel node work, wait for diagnostics, flush the store
    fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.diagnostics.take() {
            if handle.join().is_err() {
                error!("Diagnostics thread panicked");
            }
        }
        if let Err(e) = self.store.flush() {
            error!("Error flushing object store: {}", e);
        }
    }
}

impl Drop for FilesNode {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Log configured peers and store status once, after a delay. Read-only.
fn spawn_diagnostics(
    store: Arc<SledObjectStore>,
    peers: Vec<BootstrapPeer>,
    cancel: CancellationToken,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("node-diagnostics".to_string())
        .spawn(move || {
            let deadline = Instant::now() + DIAGNOSTICS_DELAY;
            while Instant::now() < deadline {
                if cancel.is_cancelled() {
                    return;
                }
                thread::sleep(DIAGNOSTICS_POLL);
            }
            for peer in &peers {
                info!(peer = %peer.peer_id, addrs = ?peer.addrs, "Bootstrap peer");
            }
            let stats = store.stats();
            info!(blocks = stats.blocks, pins = stats.pins, "Object store status");
        })
}
