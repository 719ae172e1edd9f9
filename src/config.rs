//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, an explicit
//! config file, then `CAFS__SECTION__KEY` environment variables.

use crate::logging::LoggingConfig;
use crate::node::{self, NodeOptions};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CafsConfig {
    /// Object store node settings
    #[serde(default)]
    pub node: NodeOptions,

    /// Name cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Name cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the cache database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Use the process-wide cache instance instead of a private one
    #[serde(default = "default_true")]
    pub shared: bool,
}

fn default_true() -> bool {
    true
}

/// `<data dir>/db`, falling back to `.cafs/db`
pub fn default_db_path() -> PathBuf {
    data_dir().join("db")
}

/// `<data dir>/repo`, falling back to `.cafs/repo`
pub fn default_repo_path() -> PathBuf {
    data_dir().join("repo")
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "cafs")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".cafs"))
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            shared: true,
        }
    }
}

/// Expand a leading `~` to `$HOME`
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

impl CafsConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.cache.db_path.as_os_str().is_empty() {
            errors.push("cache.db_path cannot be empty".to_string());
        }
        if let Err(e) = node::parse_bootstrap_peers(&self.node.bootstrap_peers) {
            errors.push(format!("node.bootstrap_peers: {}", e));
        }
        if let Some(swarm) = &self.node.swarm {
            if swarm.private {
                if let Err(e) = node::validate_swarm_key(&swarm.key) {
                    errors.push(format!("node.swarm.key: {}", e));
                }
            }
        }
        if let Err(e) = self.logging.validate() {
            errors.push(format!("logging: {}", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads [`CafsConfig`] from all sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration, with `explicit` (if any) overriding the global file
    pub fn load(explicit: Option<&Path>) -> Result<CafsConfig, ConfigError> {
        let defaults = Config::try_from(&CafsConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        builder = sources::global_file::add_to_builder(builder)?;

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CAFS")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("node.bootstrap_peers"),
        );

        builder.build()?.try_deserialize()
    }

    /// Load configuration from a single file on top of the defaults
    pub fn load_from_file(path: &Path) -> Result<CafsConfig, ConfigError> {
        let defaults = Config::try_from(&CafsConfig::default())?;
        Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }
}
