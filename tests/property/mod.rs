//! Property-based tests for addressing and path handling

mod paths;
