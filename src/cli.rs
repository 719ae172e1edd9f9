//! CLI domain: parse, route and output only.

mod output;
mod parse;
mod route;

pub use output::{map_error, CommandOutput, WalkRow};
pub use parse::{Cli, Commands};
pub use route::RunContext;
