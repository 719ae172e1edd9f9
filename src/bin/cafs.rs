//! cafs CLI Binary
//!
//! Command-line interface for the content-addressed file layer.

use anyhow::{anyhow, Context};
use cafs::cli::{map_error, Cli, CommandOutput, RunContext};
use cafs::config::{CafsConfig, ConfigLoader};
use cafs::logging::{init_logging, LoggingConfig};
use cafs::node::NodeType;
use clap::Parser;
use std::io::Write;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("cafs starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let context = match RunContext::new(&config, cancel) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error starting node: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    let result = context.execute(&cli.command);
    context.shutdown();
    runtime.shutdown_background();

    match result {
        Ok(output) => {
            info!("Command completed successfully");
            if let Err(e) = write_output(&output) {
                error!("Failed to write output: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Text gets a trailing newline; bytes are written untouched.
fn write_output(output: &CommandOutput) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    match output {
        CommandOutput::Text(text) if text.is_empty() => {}
        CommandOutput::Text(text) => writeln!(stdout, "{}", text)?,
        CommandOutput::Bytes(bytes) => stdout.write_all(bytes)?,
    }
    stdout.flush()
}

/// Load layered configuration, then apply CLI overrides.
fn load_config(cli: &Cli) -> anyhow::Result<CafsConfig> {
    let mut config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load config")?;
    apply_overrides(cli, &mut config);
    config
        .validate()
        .map_err(|errors| anyhow!("Invalid configuration:\n  {}", errors.join("\n  ")))?;
    Ok(config)
}

/// `--ephemeral` wins over a configured node type; with neither, the CLI keeps a
/// persistent repository so cached names resolve across runs.
fn apply_overrides(cli: &Cli, config: &mut CafsConfig) {
    if cli.ephemeral {
        config.node.node_type = Some(NodeType::Ephemeral);
    } else if config.node.node_type.is_none() {
        config.node.node_type = Some(NodeType::Default);
    }
    if let Some(ref repo) = cli.repo {
        config.node.repo_path = repo.clone();
    }
    if let Some(ref db) = cli.db {
        config.cache.db_path = db.clone();
    }
}

/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, config: &CafsConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();
    if cli.quiet {
        logging.enabled = false;
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    logging
}
