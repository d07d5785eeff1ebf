use crate::config::helpers::{optional_env, parse_optional_env};
use crate::error::ConfigError;

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl GatewayConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: optional_env("GATEWAY_HOST")?.unwrap_or(defaults.host),
            port: parse_optional_env("GATEWAY_PORT", defaults.port)?,
        })
    }

    /// `host:port`, with IPv6 hosts bracketed.
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
