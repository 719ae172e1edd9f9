//! CLI output: walk listings and error mapping.

use crate::error::FileTreeError;
use crate::tree::{FileTreeNode, NodeKind};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Result of one CLI command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Printed as a line
    Text(String),
    /// Written to stdout unchanged
    Bytes(Vec<u8>),
}

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &FileTreeError) -> String {
    match e {
        FileTreeError::NotFound(what) => format!("not found: {}", what),
        other => other.to_string(),
    }
}

/// One visited node in a walk listing
#[derive(Debug, Clone, Serialize)]
pub struct WalkRow {
    pub kind: NodeKind,
    pub path: String,
    pub name: String,
    pub cid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl WalkRow {
    pub fn from_node(node: &FileTreeNode) -> Self {
        Self {
            kind: node.kind(),
            path: node.path(),
            name: node.name().to_string(),
            cid: node.address().hash.to_hex(),
            target: node.symlink_target().map(|t| t.display().to_string()),
        }
    }
}

pub(crate) fn format_walk_text(rows: &[WalkRow]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Kind", "Path", "Cid"]);

    for row in rows {
        let kind = match row.kind {
            NodeKind::Directory => row.kind.to_string().blue().to_string(),
            NodeKind::SymbolicLink => row.kind.to_string().cyan().to_string(),
            NodeKind::File => row.kind.to_string(),
        };
        let path = match &row.target {
            Some(target) => format!("{} -> {}", row.path, target),
            None => row.path.clone(),
        };
        table.add_row(vec![kind, path, row.cid[..12].to_string()]);
    }
    table.to_string()
}

pub(crate) fn format_walk_json(rows: &[WalkRow]) -> Result<String, FileTreeError> {
    let lines = rows
        .iter()
        .map(|row| {
            serde_json::to_string(row)
                .map_err(|e| FileTreeError::Config(format!("Failed to encode row: {}", e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}
