//! CLI route table driven over an ephemeral node

use crate::integration::test_utils::write_tree;
use cafs::cli::{map_error, Commands, CommandOutput, RunContext};
use cafs::config::{CacheConfig, CafsConfig};
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn context(dir: &TempDir) -> RunContext {
    let config = CafsConfig {
        cache: CacheConfig {
            db_path: dir.path().join("db"),
            shared: false,
        },
        ..CafsConfig::default()
    };
    RunContext::new(&config, CancellationToken::new()).unwrap()
}

fn text(output: CommandOutput) -> String {
    match output {
        CommandOutput::Text(text) => text,
        CommandOutput::Bytes(bytes) => panic!("expected text, got {} bytes", bytes.len()),
    }
}

#[test]
fn test_add_then_resolve_prints_content_path() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);
    let root = temp_dir.path().join("site");
    write_tree(&root, &[("index.html", "<html>")]);

    let added = text(ctx.execute(&Commands::Add { path: root }).unwrap());
    assert!(added.starts_with("/cas/"));

    let resolved = text(
        ctx.execute(&Commands::Resolve {
            name: "site".to_string(),
        })
        .unwrap(),
    );
    assert_eq!(resolved, added);
    ctx.shutdown();
}

#[test]
fn test_cat_returns_raw_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);
    let file = temp_dir.path().join("blob.bin");
    let data = vec![0xff, 0x00, 0xfe, b'\n', 0x80];
    fs::write(&file, &data).unwrap();

    let added = text(ctx.execute(&Commands::Add { path: file }).unwrap());
    let by_name = ctx
        .execute(&Commands::Cat {
            target: "blob.bin".to_string(),
        })
        .unwrap();
    assert_eq!(by_name, CommandOutput::Bytes(data.clone()));

    let by_path = ctx.execute(&Commands::Cat { target: added }).unwrap();
    assert_eq!(by_path, CommandOutput::Bytes(data));
    ctx.shutdown();
}

#[test]
fn test_walk_json_rows() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);
    let root = temp_dir.path().join("docs");
    write_tree(&root, &[("a/b.txt", "b"), ("c.txt", "c")]);
    ctx.execute(&Commands::Add { path: root }).unwrap();

    let output = text(
        ctx.execute(&Commands::Walk {
            target: "docs".to_string(),
            format: "json".to_string(),
        })
        .unwrap(),
    );
    let rows: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let listed: Vec<(&str, &str)> = rows
        .iter()
        .map(|row| (row["kind"].as_str().unwrap(), row["path"].as_str().unwrap()))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("directory", "/"),
            ("directory", "/a"),
            ("file", "/a/b.txt"),
            ("file", "/c.txt"),
        ]
    );
    assert_eq!(rows[0]["name"], "/");
    assert_eq!(rows[2]["cid"].as_str().unwrap().len(), 64);
    ctx.shutdown();
}

#[test]
fn test_walk_text_table_and_bad_format() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);
    let root = temp_dir.path().join("docs");
    write_tree(&root, &[("readme.md", "hi")]);
    ctx.execute(&Commands::Add { path: root }).unwrap();

    let table = text(
        ctx.execute(&Commands::Walk {
            target: "docs".to_string(),
            format: "text".to_string(),
        })
        .unwrap(),
    );
    assert!(table.contains("Kind"));
    assert!(table.contains("/readme.md"));

    assert!(ctx
        .execute(&Commands::Walk {
            target: "docs".to_string(),
            format: "yaml".to_string(),
        })
        .is_err());
    ctx.shutdown();
}

#[test]
fn test_pins_and_gc() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);
    let file = temp_dir.path().join("kept.txt");
    fs::write(&file, "kept").unwrap();

    ctx.execute(&Commands::Add { path: file }).unwrap();
    let root = ctx.node().files().resolve_by_name("kept.txt").unwrap().root;

    let pins = text(ctx.execute(&Commands::Pins).unwrap());
    assert_eq!(pins, root.to_hex());

    let gc = text(ctx.execute(&Commands::Gc).unwrap());
    assert_eq!(gc, "Removed 0 unpinned blocks");
    ctx.shutdown();
}

#[test]
fn test_unknown_name_maps_to_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);

    let err = ctx
        .execute(&Commands::Resolve {
            name: "missing".to_string(),
        })
        .unwrap_err();
    assert_eq!(map_error(&err), "not found: missing");

    let err = ctx
        .execute(&Commands::Cat {
            target: "missing".to_string(),
        })
        .unwrap_err();
    assert!(map_error(&err).starts_with("not found:"));
    ctx.shutdown();
}
