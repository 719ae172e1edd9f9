//! Logging System
//!
//! Structured logging using the `tracing` crate with configurable level, format
//! and destination.

use crate::error::FileTreeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Disable all logging when false
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (if output is "file")
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Enable colored output (text format only, stdout/stderr only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(".cafs/cafs.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: true,
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), String> {
        parse_format(&self.format)?;
        parse_output(&self.output, &self.file)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    Stdout,
    Stderr,
    File(PathBuf),
    /// stderr plus a copy appended to the file
    StderrAndFile(PathBuf),
}

fn parse_format(format: &str) -> Result<Format, String> {
    match format {
        "text" => Ok(Format::Text),
        "json" => Ok(Format::Json),
        other => Err(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        )),
    }
}

fn parse_output(output: &str, file: &Path) -> Result<Output, String> {
    match output {
        "stdout" => Ok(Output::Stdout),
        "stderr" => Ok(Output::Stderr),
        "file" => Ok(Output::File(file.to_path_buf())),
        other => Err(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr' or 'file')",
            other
        )),
    }
}

/// Initialize the logging system
///
/// Environment overrides config: `CAFS_LOG` (filter), `CAFS_LOG_MODULES`,
/// `CAFS_LOG_FORMAT`, `CAFS_LOG_OUTPUT`, and `LOG_FILE` (stderr plus a copy in that
/// file, or stderr alone if the file cannot be opened).
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), FileTreeError> {
    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let (writer, ansi, fallback) = make_writer(output, use_color)?;

    let registry = Registry::default().with(filter);
    let installed = match format {
        Format::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        Format::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };

    installed.map_err(|e| FileTreeError::Config(format!("Failed to install logger: {}", e)))?;
    if let Some(reason) = fallback {
        tracing::warn!("Logging to stderr only: {}", reason);
    }
    Ok(())
}

/// Writer for `output`, whether it may use ANSI colors, and why a log file was
/// skipped when a `StderrAndFile` target could not be opened.
fn make_writer(
    output: Output,
    use_color: bool,
) -> Result<(BoxMakeWriter, bool, Option<String>), FileTreeError> {
    Ok(match output {
        Output::Stdout => (BoxMakeWriter::new(std::io::stdout), use_color, None),
        Output::Stderr => (BoxMakeWriter::new(std::io::stderr), use_color, None),
        Output::File(path) => (
            BoxMakeWriter::new(Mutex::new(open_log_file(&path)?)),
            false,
            None,
        ),
        Output::StderrAndFile(path) => match open_log_file(&path) {
            Ok(file) => (
                BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file))),
                false,
                None,
            ),
            Err(e) => (BoxMakeWriter::new(std::io::stderr), use_color, Some(e.to_string())),
        },
    })
}

fn open_log_file(path: &Path) -> Result<std::fs::File, FileTreeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            FileTreeError::Config(format!("Failed to create log directory: {}", e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| FileTreeError::Config(format!("Failed to open log file {:?}: {}", path, e)))
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, FileTreeError> {
    if config.map(|c| !c.enabled).unwrap_or(false) {
        return Ok(EnvFilter::new("off"));
    }

    if let Ok(filter) = EnvFilter::try_from_env("CAFS_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| FileTreeError::Config(format!("Invalid log directive: {}", e)))?,
            );
        }
    }

    if let Ok(modules_str) = std::env::var("CAFS_LOG_MODULES") {
        for module_spec in modules_str.split(',') {
            if let Some((module, module_level)) = module_spec.split_once('=') {
                let directive = format!("{}={}", module.trim(), module_level.trim());
                filter = filter.add_directive(directive.parse().map_err(|e| {
                    FileTreeError::Config(format!("Invalid log directive from env: {}", e))
                })?);
            }
        }
    }

    Ok(filter)
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<Format, FileTreeError> {
    if let Ok(format) = std::env::var("CAFS_LOG_FORMAT") {
        if let Ok(format) = parse_format(&format) {
            return Ok(format);
        }
    }
    parse_format(config.map(|c| c.format.as_str()).unwrap_or("text")).map_err(FileTreeError::Config)
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<Output, FileTreeError> {
    if let Some(file) = std::env::var_os("LOG_FILE").filter(|f| !f.is_empty()) {
        return Ok(Output::StderrAndFile(PathBuf::from(file)));
    }

    let file = config.map(|c| c.file.clone()).unwrap_or_else(default_log_file);
    if let Ok(output) = std::env::var("CAFS_LOG_OUTPUT") {
        return parse_output(&output, &file).map_err(FileTreeError::Config);
    }

    let output = config.map(|c| c.output.as_str()).unwrap_or("stderr");
    parse_output(output, &file).map_err(FileTreeError::Config)
}
