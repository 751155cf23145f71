//! CLI module
//!
//! Command-line interface for querying Sophos Central.
//!
//! # Commands
//!
//! - `whoami` - Show the caller identity and API host
//! - `list` - Fetch a list endpoint, optionally every page

mod commands;
mod runner;

pub use commands::{parse_key_val, Cli, Commands, OutputFormat};
pub use runner::{render, Runner};
