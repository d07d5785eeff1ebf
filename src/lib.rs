//! swarmgate: an HTTP gateway for containers, services and volumes on a
//! Docker-compatible container engine.
//!
//! - [`engine`]: the [`ContainerEngine`](engine::ContainerEngine) abstraction
//!   and its bollard implementation
//! - [`gateway`]: axum router, parameter parsing and route handlers
//! - [`config`]: environment-driven configuration
//! - [`error`]: error types and the error-kind to HTTP status table

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod testing;
