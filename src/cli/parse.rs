//! CLI parse: clap types for cafs. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cafs CLI - content-addressed file trees
#[derive(Parser)]
#[command(name = "cafs")]
#[command(about = "Publish local files into a content-addressed store and browse them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use a throwaway repository instead of the persistent one
    #[arg(long)]
    pub ephemeral: bool,

    /// Repository directory
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Name cache database directory
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable logging
    #[arg(long)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish a file or directory and cache it under its basename
    Add {
        /// Local file or directory
        path: PathBuf,
    },
    /// Print the content path cached for a name
    Resolve {
        name: String,
    },
    /// Print the content of a file or symlink
    Cat {
        /// Content path or cached name
        target: String,
    },
    /// List every entry below a content path or cached name
    Walk {
        /// Content path or cached name
        target: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List pinned roots
    Pins,
    /// Remove blocks not reachable from a pin
    Gc,
}
