//! CLI command implementations
//!
//! `serve` loads configuration, boots the gateway against its storage
//! driver and runs the HTTP server on a tokio runtime. `config` prints the
//! effective configuration.

use std::path::Path;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::http_server::HttpServer;
use crate::observability::{Logger, ObservationScope};
use crate::storage::MemoryDriver;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Parse process arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, host, port } => serve(config.as_deref(), host, port),
        Command::Config { config } => print_config(config.as_deref()),
    }
}

/// Resolve the effective configuration: file, then environment, then flags
pub fn effective_config(
    path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> CliResult<GatewayConfig> {
    let mut config = GatewayConfig::load_or_default(path)?;
    config.apply_env()?;
    config.apply_overrides(host, port.map(|p| p.to_string()))?;
    Ok(config)
}

/// Boot the gateway and serve HTTP until the process exits
pub fn serve(path: Option<&Path>, host: Option<String>, port: Option<u16>) -> CliResult<()> {
    let config = effective_config(path, host, port)?;
    Logger::set_min_severity(config.severity()?);

    let scope = ObservationScope::new("BOOT");

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let server_config = config.server.clone();
    let gateway = Arc::new(Gateway::new(Arc::new(MemoryDriver::new()), config));

    if let Err(e) = rt.block_on(gateway.boot()) {
        scope.fail(e.kind().as_str());
        return Err(e.into());
    }
    scope.complete();

    let server = HttpServer::new(gateway, server_config);
    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Print the effective configuration as JSON
pub fn print_config(path: Option<&Path>) -> CliResult<()> {
    let config = effective_config(path, None, None)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"port": 7000}}}}"#).unwrap();

        let config = effective_config(Some(file.path()), None, Some(7100)).unwrap();
        assert_eq!(config.server.port, 7100);
    }

    #[test]
    fn test_missing_config_is_config_error() {
        let err = effective_config(Some(Path::new("/nonexistent/docgate.json")), None, None)
            .unwrap_err();
        assert_eq!(err.code(), &crate::cli::CliErrorCode::ConfigError);
    }
}
