//! cafs: Content-Addressed File System Layer
//!
//! Publishes local files and directories into a content-addressed object store,
//! remembers each published tree under its basename, and exposes the stored
//! tree as a navigable file hierarchy.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod store;
pub mod tree;
pub mod types;
