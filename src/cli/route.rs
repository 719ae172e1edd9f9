//! CLI route: single route table and run context. Dispatches to the node and output.

use crate::cli::output::{format_walk_json, format_walk_text, CommandOutput, WalkRow};
use crate::cli::parse::Commands;
use crate::config::CafsConfig;
use crate::error::FileTreeError;
use crate::node::FilesNode;
use crate::tree::FileTreeNode;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runtime context for CLI execution: a running node bound to the process token.
pub struct RunContext {
    node: FilesNode,
}

impl RunContext {
    /// Start the node described by `config`.
    pub fn new(config: &CafsConfig, cancel: CancellationToken) -> Result<Self, FileTreeError> {
        let node = FilesNode::start(&config.node, &config.cache, cancel)?;
        Ok(Self { node })
    }

    pub fn node(&self) -> &FilesNode {
        &self.node
    }

    /// Run one command and return its output.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, FileTreeError> {
        match command {
            Commands::Add { path } => self.handle_add(path).map(CommandOutput::Text),
            Commands::Resolve { name } => Ok(CommandOutput::Text(
                self.node.files().resolve_by_name(name)?.to_string(),
            )),
            Commands::Cat { target } => self.handle_cat(target).map(CommandOutput::Bytes),
            Commands::Walk { target, format } => {
                self.handle_walk(target, format).map(CommandOutput::Text)
            }
            Commands::Pins => {
                let pins = self.node.store().pins()?;
                Ok(CommandOutput::Text(
                    pins.iter()
                        .map(|cid| cid.to_hex())
                        .collect::<Vec<_>>()
                        .join("\n"),
                ))
            }
            Commands::Gc => {
                let removed = self.node.store().gc(self.node.files().cancellation())?;
                Ok(CommandOutput::Text(format!("Removed {} unpinned blocks", removed)))
            }
        }
    }

    fn handle_add(&self, path: &Path) -> Result<String, FileTreeError> {
        let node = self.node.files().add_path(path)?;
        info!(kind = %node.kind(), "Added {}", path.display());
        Ok(node.logical_path().to_string())
    }

    fn handle_cat(&self, target: &str) -> Result<Vec<u8>, FileTreeError> {
        self.node.files().open(target)?.read()
    }

    fn handle_walk(&self, target: &str, format: &str) -> Result<String, FileTreeError> {
        let files = self.node.files();
        let root = files.open(target)?;

        let mut rows = Vec::new();
        files.walk(&root, &mut |node: &mut FileTreeNode| -> Result<(), FileTreeError> {
            rows.push(WalkRow::from_node(node));
            Ok(())
        })?;

        match format {
            "json" => format_walk_json(&rows),
            "text" => Ok(format_walk_text(&rows)),
            other => Err(FileTreeError::Config(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }

    /// Cancel outstanding work and close the node.
    pub fn shutdown(mut self) {
        self.node.shutdown();
    }
}
