//! Configuration for swarmgate.
//!
//! Values come from the environment (after `.env` has been loaded with
//! dotenvy), then CLI flags override them. The engine endpoint itself is not
//! configured here: bollard reads `DOCKER_HOST` on its own.

pub(crate) mod helpers;

mod engine;
mod gateway;
mod logging;

pub use engine::EngineConfig;
pub use gateway::GatewayConfig;
pub use logging::{LogConfig, LogFormat};

use crate::error::ConfigError;

/// Resolved process configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub engine: EngineConfig,
    pub log: LogConfig,
}

impl Config {
    /// Resolve every section from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gateway: GatewayConfig::resolve()?,
            engine: EngineConfig::resolve()?,
            log: LogConfig::resolve()?,
        })
    }
}
