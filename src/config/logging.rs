use crate::config::helpers::optional_env;
use crate::error::ConfigError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "invalid log format '{}', expected 'text' or 'json'",
                s
            )),
        }
    }
}

/// Logging configuration. Filtering itself is controlled by `RUST_LOG`.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl LogConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let format = match optional_env("LOG_FORMAT")? {
            Some(f) => f.parse().map_err(|e| ConfigError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                message: e,
            })?,
            None => LogFormat::default(),
        };
        Ok(Self { format })
    }
}
