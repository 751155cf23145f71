//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sophos Central API client
#[derive(Parser, Debug)]
#[command(name = "sophos-central")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which partner, organization or tenant the credentials belong to
    Whoami,

    /// Fetch a list endpoint
    List {
        /// Endpoint path, e.g. /endpoint/v1/endpoints
        path: String,

        /// Tenant to scope the request to
        #[arg(long, requires = "host")]
        tenant: Option<String>,

        /// Data-region host of the tenant
        #[arg(long, requires = "tenant")]
        host: Option<String>,

        /// Extra query parameter (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        query: Vec<(String, String)>,

        /// Fetch every page, not just the first
        #[arg(long)]
        all: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON on one line
    Json,
    /// Indented JSON
    Pretty,
}

/// Parse a `KEY=VALUE` argument
pub fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
