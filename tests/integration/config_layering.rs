//! Configuration layering: defaults, global file, explicit file, environment

use crate::integration::test_utils::with_env;
use cafs::config::ConfigLoader;
use cafs::node::NodeType;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_explicit_file_overrides_global_file() {
    let temp_dir = TempDir::new().unwrap();
    let global_dir = temp_dir.path().join("xdg/cafs");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.toml"),
        "[cache]\ndb_path = \"/global/db\"\n\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();
    let explicit = temp_dir.path().join("explicit.toml");
    fs::write(&explicit, "[cache]\ndb_path = \"/explicit/db\"\n").unwrap();

    let xdg = temp_dir.path().join("xdg");
    let config = with_env(&[("XDG_CONFIG_HOME", xdg.to_str().unwrap())], || {
        ConfigLoader::load(Some(&explicit)).unwrap()
    });

    assert_eq!(config.cache.db_path, PathBuf::from("/explicit/db"));
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_environment_overrides_files() {
    let temp_dir = TempDir::new().unwrap();
    let explicit = temp_dir.path().join("explicit.toml");
    fs::write(&explicit, "[node]\nnode_type = \"ephemeral\"\n").unwrap();
    let xdg = temp_dir.path().join("empty-xdg");

    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", xdg.to_str().unwrap()),
            ("CAFS__NODE__NODE_TYPE", "default"),
            ("CAFS__CACHE__SHARED", "false"),
        ],
        || ConfigLoader::load(Some(&explicit)).unwrap(),
    );

    assert_eq!(config.node.node_type, Some(NodeType::Default));
    assert!(!config.cache.shared);
}

#[test]
fn test_missing_explicit_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let xdg = temp_dir.path().join("empty-xdg");
    let result = with_env(&[("XDG_CONFIG_HOME", xdg.to_str().unwrap())], || {
        ConfigLoader::load(Some(&temp_dir.path().join("missing.toml")))
    });
    assert!(result.is_err());
}
