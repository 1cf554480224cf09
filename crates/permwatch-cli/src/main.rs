//! permwatch CLI
//!
//! Runs the permission actors against the configurable static provider.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use permwatch_cli::check_cmd;
use permwatch_cli::demo_cmd::{self, DemoArgs};
use permwatch_cli::watch_cmd::{self, WatchArgs};
use permwatch_core::config::{apply_env_overrides, load_config, load_config_file};
use permwatch_core::tracing_init::{default_filter, init_tracing};
use permwatch_core::{Config, Permission};

/// Permission status monitor.
#[derive(Debug, Parser)]
#[command(name = "permwatch", version, about)]
struct Cli {
    /// Settings file to use instead of the global and project settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for permwatch crates (`RUST_LOG` takes precedence)
    #[arg(long, global = true, env = "PERMWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "PERMWATCH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check every permission once and print the statuses
    Check,
    /// Request one permission and print the result
    Request {
        /// Permission to request (bluetooth, microphone)
        permission: Permission,
    },
    /// Subscribe to permissions and print every status change
    Watch(WatchArgs),
    /// Run the counting feature component end to end
    Demo(DemoArgs),
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = load_config_file(path)?;
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config
        }
        None => load_config(std::env::current_dir().ok().as_deref())?,
    };
    if let Some(level) = &cli.log_level {
        config.log_level.clone_from(level);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    init_tracing(&default_filter(&config.log_level), cli.log_json);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting permwatch");
    debug!(?config, "Resolved configuration");

    match cli.command {
        Commands::Check => check_cmd::run_check(&config).await?,
        Commands::Request { permission } => check_cmd::run_request(&config, permission).await?,
        Commands::Watch(ref args) => watch_cmd::run(&config, args).await?,
        Commands::Demo(ref args) => demo_cmd::run(&config, args).await?,
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_with_repeated_permissions() {
        let cli = Cli::try_parse_from([
            "permwatch",
            "watch",
            "--permission",
            "bluetooth",
            "-p",
            "microphone",
            "--request",
            "bluetooth",
            "--settle-ms",
            "250",
        ])
        .unwrap();
        let Commands::Watch(args) = cli.command else {
            panic!("expected watch subcommand");
        };
        assert_eq!(
            args.permissions,
            [Permission::Bluetooth, Permission::Microphone]
        );
        assert_eq!(args.requests, [Permission::Bluetooth]);
        assert_eq!(args.settle_ms, Some(250));
    }

    #[test]
    fn rejects_unknown_permission() {
        assert!(Cli::try_parse_from(["permwatch", "request", "camera"]).is_err());
    }

    #[test]
    fn watch_requires_a_permission() {
        assert!(Cli::try_parse_from(["permwatch", "watch"]).is_err());
    }

    #[test]
    fn explicit_config_file_and_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "checker": { "provider_timeout_ms": 75 } }"#).unwrap();

        let cli = Cli::try_parse_from([
            "permwatch",
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            "trace",
            "check",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.checker.provider_timeout_ms, 75);
        assert!(matches!(cli.command, Commands::Check));
    }
}
