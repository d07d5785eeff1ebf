//! HTTP gateway in front of the container engine.
//!
//! Every route parses its parameters with [`params::RequestArgs`], calls the
//! shared [`ContainerEngine`](crate::engine::ContainerEngine) and turns the
//! outcome into JSON. Failures become [`GatewayError`](crate::error::GatewayError)
//! and are mapped to a status by a single table.

pub mod handlers;
pub mod params;
pub mod server;
pub mod types;

pub use params::{Arg, RequestArgs};
pub use server::{GatewayState, router, serve};
pub use types::{HealthResponse, IdResponse, MessageResponse};
