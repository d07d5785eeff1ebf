//! Error types for swarmgate.
//!
//! Every failure a route can produce is classified into an [`ErrorKind`],
//! and [`ErrorKind::status`] is the single table that decides the HTTP
//! status returned for it.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::gateway::types::MessageResponse;

/// Configuration resolution errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// An environment variable is set but is not valid unicode.
    #[error("Environment variable {key} is not valid unicode")]
    NotUnicode {
        /// Variable name.
        key: String,
    },
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors reported by a [`ContainerEngine`](crate::engine::ContainerEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The addressed container, service, volume or task does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The image is absent locally and could not be pulled.
    #[error("Image '{image}' is not available: {reason}")]
    ImageNotFound {
        /// Image reference as requested.
        image: String,
        /// Pull failure detail.
        reason: String,
    },

    /// The container stopped right after start with a non-zero exit code.
    #[error("Container {id} exited with code {code}")]
    NonZeroExit {
        /// Container id.
        id: String,
        /// Exit code reported by the engine.
        code: i64,
    },

    /// The request uses a feature the engine's API version does not support.
    #[error("Unsupported API version: {0}")]
    UnsupportedVersion(String),

    /// The engine rejected an argument for a reason only it can judge.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine could not be reached.
    #[error("Container engine unavailable: {0}")]
    Unavailable(String),

    /// The engine answered with an error status.
    #[error("Engine API error ({status_code}): {message}")]
    Api {
        /// HTTP status returned by the engine daemon.
        status_code: u16,
        /// Daemon error message.
        message: String,
    },

    /// The engine's answer could not be turned into an attribute object.
    #[error("Malformed engine response: {0}")]
    Malformed(String),

    /// The engine client failed before a request reached the daemon.
    #[error("Engine client error: {0}")]
    Client(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// The resource family a route works on. Used in not-found messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Container,
    Service,
    Volume,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container => write!(f, "Container"),
            Self::Service => write!(f, "Service"),
            Self::Volume => write!(f, "Volume"),
        }
    }
}

/// Classification of every error a route can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, unknown or malformed request parameter.
    Validation,
    /// The engine refused an argument.
    InvalidArgument,
    /// The addressed resource does not exist.
    NotFound,
    /// The requested image does not exist.
    ImageNotFound,
    /// The container exited with a non-zero code.
    NonZeroExit,
    /// The engine API version does not support the request.
    UnsupportedVersion,
    /// The engine could not be reached.
    Unavailable,
    /// Any other engine failure.
    Engine,
}

impl ErrorKind {
    /// HTTP status for this kind.
    ///
    /// Not-found is reported as 200 with an explanatory message; existing
    /// callers of the API depend on that.
    pub fn status(self) -> StatusCode {
        match self {
            Self::Validation | Self::InvalidArgument => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::OK,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ImageNotFound | Self::NonZeroExit | Self::UnsupportedVersion | Self::Engine => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<&EngineError> for ErrorKind {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::NotFound(_) => Self::NotFound,
            EngineError::ImageNotFound { .. } => Self::ImageNotFound,
            EngineError::NonZeroExit { .. } => Self::NonZeroExit,
            EngineError::UnsupportedVersion(_) => Self::UnsupportedVersion,
            EngineError::InvalidArgument(_) => Self::InvalidArgument,
            EngineError::Unavailable(_) => Self::Unavailable,
            EngineError::Api { .. } | EngineError::Malformed(_) | EngineError::Client(_) => {
                Self::Engine
            }
        }
    }
}

/// Result type for route handlers.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors returned by route handlers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required parameter was not supplied.
    #[error("Missing required parameter: {field} ({help})")]
    MissingField {
        field: String,
        help: &'static str,
    },

    /// Parameters the route does not accept were supplied.
    #[error("Unknown arguments: {}", .0.join(", "))]
    UnknownArguments(Vec<String>),

    /// A parameter was supplied with an unusable value.
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// An engine call failed.
    #[error("{resource} operation failed: {source}")]
    Engine {
        resource: Resource,
        #[source]
        source: EngineError,
    },
}

impl GatewayError {
    /// Adapter for `map_err` that tags an engine error with its resource.
    pub fn engine(resource: Resource) -> impl Fn(EngineError) -> Self {
        move |source| Self::Engine { resource, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } | Self::UnknownArguments(_) | Self::InvalidField { .. } => {
                ErrorKind::Validation
            }
            Self::Engine { source, .. } => ErrorKind::from(source),
        }
    }

    /// Human-readable message placed in the response body.
    pub fn message(&self) -> String {
        let Self::Engine { resource, source } = self else {
            return self.to_string();
        };
        match ErrorKind::from(source) {
            ErrorKind::NotFound => format!("{resource} does not exist"),
            ErrorKind::ImageNotFound => "Specified image does not exist".to_string(),
            ErrorKind::NonZeroExit => "Container exited with a non-zero exit code".to_string(),
            ErrorKind::UnsupportedVersion => {
                "One or more arguments is not supported with the current API version".to_string()
            }
            ErrorKind::InvalidArgument => match source {
                EngineError::InvalidArgument(detail) => detail.clone(),
                other => other.to_string(),
            },
            ErrorKind::Unavailable => "Container engine is unavailable".to_string(),
            ErrorKind::Validation | ErrorKind::Engine => "Server error".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match (&self, kind) {
            (Self::Engine { resource, source }, ErrorKind::NotFound) => {
                tracing::debug!(%resource, error = %source, "Resource not found");
            }
            (Self::Engine { resource, source }, _) => {
                tracing::warn!(%resource, error = %source, "Engine call failed");
            }
            _ => tracing::debug!("Rejected request: {}", self),
        }

        let body = MessageResponse::new(self.message());
        (kind.status(), Json(body)).into_response()
    }
}

/// Errors raised while bringing the server up.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid listen address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Failed to bind to {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}
