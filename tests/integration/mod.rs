//! Integration tests for the content-addressed file layer


mod cli_commands;
mod config_layering;
mod name_cache;
mod node_bootstrap;
mod object_store;
