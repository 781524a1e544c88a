//! CLI module for docgate
//!
//! Provides command-line interface for:
//! - serve: Boot the gateway and serve HTTP
//! - config: Print the effective configuration

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{effective_config, print_config, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
