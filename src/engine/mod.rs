//! Container engine access.
//!
//! The gateway never talks to Docker directly. It holds an
//! `Arc<dyn ContainerEngine>` built once at startup and shared by every
//! request, so handlers can be exercised against
//! [`StubEngine`](crate::testing::StubEngine) as easily as against the
//! real [`DockerEngine`].
//!
//! ```text
//!   handler ──▶ ContainerEngine ──▶ DockerEngine ──▶ bollard ──▶ dockerd
//!                      ▲
//!                      └── StubEngine (tests)
//! ```

pub mod detect;
pub mod docker;
pub mod types;

use async_trait::async_trait;

pub use detect::{EngineDetection, EngineStatus, Platform, check_engine};
pub use docker::DockerEngine;
pub use types::{
    ContainerDetails, ContainerSpec, ContainerStatus, EndpointMode, EndpointSpec, PortMapping,
    ResourceLimits, ServiceDetails, ServiceMode, ServiceSpec, VolumeDetails, VolumeSpec, short_id,
};

use crate::error::EngineResult;

/// Operations the gateway forwards to the container engine.
///
/// `name` arguments accept either a resource name or an id (full or
/// abbreviated), as the engine itself does.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check that the engine answers.
    async fn ping(&self) -> EngineResult<()>;

    /// Create and start a detached container, returning its id.
    async fn run_container(&self, spec: &ContainerSpec) -> EngineResult<String>;

    async fn inspect_container(&self, name: &str) -> EngineResult<ContainerDetails>;

    async fn stop_container(&self, id: &str) -> EngineResult<()>;

    /// Create a service, returning its id.
    async fn create_service(&self, spec: &ServiceSpec) -> EngineResult<String>;

    async fn inspect_service(&self, name: &str) -> EngineResult<ServiceDetails>;

    async fn remove_service(&self, id: &str) -> EngineResult<()>;

    /// Set the replica count of a replicated service.
    async fn scale_service(&self, name: &str, replicas: u64) -> EngineResult<()>;

    /// Tasks belonging to the service with the given id, as engine attribute objects.
    async fn service_tasks(&self, service_id: &str) -> EngineResult<Vec<serde_json::Value>>;

    async fn create_volume(&self, spec: &VolumeSpec) -> EngineResult<VolumeDetails>;

    async fn inspect_volume(&self, name: &str) -> EngineResult<VolumeDetails>;

    async fn remove_volume(&self, name: &str, force: bool) -> EngineResult<()>;

    async fn list_volumes(&self) -> EngineResult<Vec<VolumeDetails>>;
}
