//! CLI argument definitions using clap
//!
//! Commands:
//! - docgate serve [--config <path>] [--host <host>] [--port <port>]
//! - docgate config [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docgate - a schema-detecting data-access gateway over a document store
#[derive(Parser, Debug)]
#[command(name = "docgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
