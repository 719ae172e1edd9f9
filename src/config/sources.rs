//! Configuration sources

pub mod global_file;
