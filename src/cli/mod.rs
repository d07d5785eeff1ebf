//! CLI command handling.
//!
//! Provides subcommands for:
//! - Running the gateway (`serve`, the default)
//! - Checking that the container engine is reachable (`check`)

mod check;

pub use check::run_check_command;

use clap::{ColorChoice, Parser, Subcommand};

use crate::config::{Config, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "swarmgate")]
#[command(about = "HTTP gateway for containers, services and volumes on a Docker engine")]
#[command(
    long_about = "swarmgate forwards a small JSON API to a Docker-compatible container engine.\nExamples:\n  swarmgate  # Serve on 127.0.0.1:5000\n  swarmgate serve --host 0.0.0.0 --port 8080\n  swarmgate check  # Is the engine reachable?"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address to listen on
    #[arg(long, global = true, env = "GATEWAY_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, global = true, env = "GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API (default if no subcommand given)
    Serve,

    /// Check that the container engine is installed and answering
    #[command(
        long_about = "Ping the container engine and print the steps to fix it when it is not reachable.\nExits with status 1 when the engine is unavailable."
    )]
    Check,
}

impl Cli {
    /// Check if we should serve (default behavior or explicit `serve` command).
    pub fn should_serve(&self) -> bool {
        matches!(self.command, None | Some(Command::Serve))
    }

    /// Override resolved configuration with flags given on the command line.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.gateway.host = host.clone();
        }
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if self.log_json {
            config.log.format = LogFormat::Json;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::helpers::ENV_MUTEX;
    use clap::CommandFactory;

    #[test]
    fn test_version() {
        let cmd = Cli::command();
        assert_eq!(
            cmd.get_version().unwrap_or("unknown"),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_is_serve() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let cli = Cli::try_parse_from(["swarmgate"]).unwrap();
        assert!(cli.should_serve());

        let cli = Cli::try_parse_from(["swarmgate", "check"]).unwrap();
        assert!(!cli.should_serve());
        assert_eq!(cli.command, Some(Command::Check));
    }

    #[test]
    fn test_flags_override_config() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let cli = Cli::try_parse_from([
            "swarmgate",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--log-json",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_bad_port() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        assert!(Cli::try_parse_from(["swarmgate", "--port", "http"]).is_err());
    }
}
