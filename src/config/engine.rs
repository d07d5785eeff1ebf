use std::time::Duration;

use crate::config::helpers::{parse_bool_env, parse_optional_env};
use crate::error::ConfigError;

/// Container engine client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Timeout applied to every engine request.
    pub timeout: Duration,
    /// Ping the engine at startup and warn if it does not answer.
    pub ping_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            ping_on_start: true,
        }
    }
}

impl EngineConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_secs: u64 =
            parse_optional_env("ENGINE_TIMEOUT_SECS", defaults.timeout.as_secs())?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ENGINE_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            ping_on_start: parse_bool_env("ENGINE_PING_ON_START", defaults.ping_on_start)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::helpers::ENV_MUTEX;

    fn clear_engine_env() {
        // SAFETY: Only called under ENV_MUTEX in tests.
        unsafe {
            std::env::remove_var("ENGINE_TIMEOUT_SECS");
            std::env::remove_var("ENGINE_PING_ON_START");
        }
    }

    #[test]
    fn test_engine_env_parsed() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_engine_env();

        // SAFETY: Under ENV_MUTEX.
        unsafe {
            std::env::set_var("ENGINE_TIMEOUT_SECS", "15");
            std::env::set_var("ENGINE_PING_ON_START", "no");
        }

        let config = EngineConfig::resolve().expect("resolve should succeed");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(!config.ping_on_start);

        clear_engine_env();
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_engine_env();

        // SAFETY: Under ENV_MUTEX.
        unsafe {
            std::env::set_var("ENGINE_TIMEOUT_SECS", "0");
        }
        assert!(EngineConfig::resolve().is_err());

        clear_engine_env();
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_engine_env();

        // SAFETY: Under ENV_MUTEX.
        unsafe {
            std::env::set_var("ENGINE_PING_ON_START", "sometimes");
        }
        let err = EngineConfig::resolve().unwrap_err();
        assert!(err.to_string().contains("ENGINE_PING_ON_START"));

        clear_engine_env();
    }
}
