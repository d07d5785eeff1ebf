//! swarmgate - Main entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use swarmgate::{
    cli::{Cli, Command, run_check_command},
    config::{Config, LogFormat},
    engine::{ContainerEngine, DockerEngine},
    gateway::{GatewayState, serve},
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env first so clap's env fallbacks see it too
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config);

    init_tracing(config.log.format);

    let engine = Arc::new(DockerEngine::connect(&config.engine)?);

    if cli.command == Some(Command::Check) {
        let ok = run_check_command(engine.as_ref()).await;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    if config.engine.ping_on_start {
        match engine.ping().await {
            Ok(()) => tracing::info!("Container engine reachable"),
            Err(e) => tracing::warn!(
                "Container engine not reachable yet, requests will fail until it is: {}",
                e
            ),
        }
    }

    serve(&config.gateway, GatewayState::new(engine)).await?;
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("swarmgate=info,tower_http=info"));

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
