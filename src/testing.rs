//! In-memory engine for tests.
//!
//! Provides [`StubEngine`], a [`ContainerEngine`] that keeps containers,
//! services and volumes in memory, records every call it receives, and can
//! be switched to fail with a chosen error.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swarmgate::gateway::{GatewayState, router};
//! use swarmgate::testing::StubEngine;
//!
//! let engine = Arc::new(StubEngine::new().with_container("web", "running"));
//! let app = router(GatewayState::new(engine.clone()));
//! // drive `app` with tower::ServiceExt::oneshot, then inspect engine.calls()
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::json;

use crate::engine::{
    ContainerDetails, ContainerEngine, ContainerSpec, ContainerStatus, ServiceDetails,
    ServiceMode, ServiceSpec, VolumeDetails, VolumeSpec,
};
use crate::error::{EngineError, EngineResult};

/// Error a failing [`StubEngine`] returns from every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubFailure {
    /// `EngineError::NotFound`.
    NotFound,
    /// `EngineError::Api` with status 500.
    Api,
    /// `EngineError::Unavailable`.
    Unavailable,
    /// `EngineError::UnsupportedVersion`.
    UnsupportedVersion,
}

impl StubFailure {
    fn to_error(self) -> EngineError {
        match self {
            Self::NotFound => EngineError::NotFound("stub: no such object".to_string()),
            Self::Api => EngineError::Api {
                status_code: 500,
                message: "stub engine failure".to_string(),
            },
            Self::Unavailable => EngineError::Unavailable("stub engine unavailable".to_string()),
            Self::UnsupportedVersion => {
                EngineError::UnsupportedVersion("stub: feature needs a newer API".to_string())
            }
        }
    }
}

#[derive(Debug, Clone)]
struct StubContainer {
    id: String,
    name: String,
    image: String,
    status: String,
    exit_code: i64,
}

#[derive(Debug, Clone)]
struct StubService {
    id: String,
    name: String,
    /// `None` for a global service.
    replicas: Option<u64>,
}

#[derive(Debug, Clone)]
struct StubVolume {
    name: String,
    driver: String,
    labels: HashMap<String, String>,
}

#[derive(Default)]
struct StubState {
    next_id: u64,
    containers: Vec<StubContainer>,
    services: Vec<StubService>,
    volumes: Vec<StubVolume>,
    missing_images: Vec<String>,
    crashing_images: Vec<String>,
    calls: Vec<&'static str>,
    failure: Option<StubFailure>,
    last_service_spec: Option<ServiceSpec>,
    removed_volumes: Vec<(String, bool)>,
}

impl StubState {
    fn new_id(&mut self) -> String {
        self.next_id += 1;
        let h = self.next_id.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        format!("{h:016x}{h:016x}{h:016x}{h:016x}")
    }

    /// Record a call and return the configured failure, if any.
    fn enter(&mut self, op: &'static str) -> EngineResult<()> {
        self.calls.push(op);
        match self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

fn matches_ref(name: &str, id: &str, reference: &str) -> bool {
    !reference.is_empty() && (name == reference || id.starts_with(reference))
}

/// Recording in-memory engine.
#[derive(Default)]
pub struct StubEngine {
    state: Mutex<StubState>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a container in the given state (`running`, `exited`, `paused`, ...).
    pub fn with_container(self, name: &str, status: &str) -> Self {
        {
            let mut state = self.lock();
            let id = state.new_id();
            state.containers.push(StubContainer {
                id,
                name: name.to_string(),
                image: "busybox:latest".to_string(),
                status: status.to_string(),
                exit_code: 0,
            });
        }
        self
    }

    /// Seed a replicated service.
    pub fn with_service(self, name: &str, replicas: u64) -> Self {
        self.push_service(name, Some(replicas))
    }

    /// Seed a global-mode service.
    pub fn with_global_service(self, name: &str) -> Self {
        self.push_service(name, None)
    }

    fn push_service(self, name: &str, replicas: Option<u64>) -> Self {
        {
            let mut state = self.lock();
            let id = state.new_id();
            state.services.push(StubService {
                id,
                name: name.to_string(),
                replicas,
            });
        }
        self
    }

    pub fn with_volume(self, name: &str) -> Self {
        self.lock().volumes.push(StubVolume {
            name: name.to_string(),
            driver: "local".to_string(),
            labels: HashMap::new(),
        });
        self
    }

    /// Make `run_container` fail as if the image could not be pulled.
    pub fn with_missing_image(self, image: &str) -> Self {
        self.lock().missing_images.push(image.to_string());
        self
    }

    /// Make containers from this image exit with code 1 right after start.
    pub fn with_crashing_image(self, image: &str) -> Self {
        self.lock().crashing_images.push(image.to_string());
        self
    }

    /// Make every subsequent call fail (or succeed again with `None`).
    pub fn set_failure(&self, failure: Option<StubFailure>) {
        self.lock().failure = failure;
    }

    /// Total number of engine calls received.
    pub fn calls(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of calls received for one operation (e.g. `"stop_container"`).
    pub fn calls_to(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// The last spec passed to `create_service`.
    pub fn last_service_spec(&self) -> Option<ServiceSpec> {
        self.lock().last_service_spec.clone()
    }

    pub fn container_status(&self, name: &str) -> Option<String> {
        self.lock()
            .containers
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.status.clone())
    }

    pub fn container_id(&self, name: &str) -> Option<String> {
        self.lock()
            .containers
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id.clone())
    }

    pub fn service_id(&self, name: &str) -> Option<String> {
        self.lock()
            .services
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id.clone())
    }

    pub fn service_replicas(&self, name: &str) -> Option<u64> {
        self.lock()
            .services
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.replicas)
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.lock().services.iter().any(|s| s.name == name)
    }

    pub fn has_volume(&self, name: &str) -> bool {
        self.lock().volumes.iter().any(|v| v.name == name)
    }

    /// Volumes removed so far, with the `force` flag each removal used.
    pub fn removed_volumes(&self) -> Vec<(String, bool)> {
        self.lock().removed_volumes.clone()
    }
}

fn container_details(c: &StubContainer) -> ContainerDetails {
    ContainerDetails {
        id: c.id.clone(),
        status: ContainerStatus::parse(&c.status),
        attrs: json!({
            "Id": c.id,
            "Name": format!("/{}", c.name),
            "State": { "Status": c.status, "ExitCode": c.exit_code },
            "Config": { "Image": c.image },
        }),
    }
}

fn service_details(s: &StubService) -> ServiceDetails {
    let mode = match s.replicas {
        Some(replicas) => json!({ "Replicated": { "Replicas": replicas } }),
        None => json!({ "Global": {} }),
    };
    ServiceDetails {
        id: s.id.clone(),
        attrs: json!({
            "ID": s.id,
            "Spec": { "Name": s.name, "Mode": mode },
        }),
    }
}

fn volume_details(v: &StubVolume) -> VolumeDetails {
    VolumeDetails {
        name: v.name.clone(),
        attrs: json!({
            "Name": v.name,
            "Driver": v.driver,
            "Mountpoint": format!("/var/lib/docker/volumes/{}/_data", v.name),
            "Labels": v.labels,
            "Scope": "local",
        }),
    }
}

fn not_found(kind: &str, reference: &str) -> EngineError {
    EngineError::NotFound(format!("No such {kind}: {reference}"))
}

#[async_trait]
impl ContainerEngine for StubEngine {
    async fn ping(&self) -> EngineResult<()> {
        self.lock().enter("ping")
    }

    async fn run_container(&self, spec: &ContainerSpec) -> EngineResult<String> {
        let mut state = self.lock();
        state.enter("run_container")?;

        if state.missing_images.contains(&spec.image) {
            return Err(EngineError::ImageNotFound {
                image: spec.image.clone(),
                reason: "pull access denied".to_string(),
            });
        }
        if state.containers.iter().any(|c| c.name == spec.name) {
            return Err(EngineError::Api {
                status_code: 409,
                message: format!("Conflict. The container name \"/{}\" is already in use", spec.name),
            });
        }

        let id = state.new_id();
        let crashed = state.crashing_images.contains(&spec.image);
        state.containers.push(StubContainer {
            id: id.clone(),
            name: spec.name.clone(),
            image: spec.image.clone(),
            status: if crashed { "exited" } else { "running" }.to_string(),
            exit_code: if crashed { 1 } else { 0 },
        });

        if crashed {
            return Err(EngineError::NonZeroExit { id, code: 1 });
        }
        Ok(id)
    }

    async fn inspect_container(&self, name: &str) -> EngineResult<ContainerDetails> {
        let mut state = self.lock();
        state.enter("inspect_container")?;
        state
            .containers
            .iter()
            .find(|c| matches_ref(&c.name, &c.id, name))
            .map(container_details)
            .ok_or_else(|| not_found("container", name))
    }

    async fn stop_container(&self, id: &str) -> EngineResult<()> {
        let mut state = self.lock();
        state.enter("stop_container")?;
        let container = state
            .containers
            .iter_mut()
            .find(|c| matches_ref(&c.name, &c.id, id))
            .ok_or_else(|| not_found("container", id))?;
        container.status = "exited".to_string();
        Ok(())
    }

    async fn create_service(&self, spec: &ServiceSpec) -> EngineResult<String> {
        let mut state = self.lock();
        state.enter("create_service")?;
        state.last_service_spec = Some(spec.clone());

        let id = state.new_id();
        let replicas = match spec.mode {
            ServiceMode::Replicated { replicas } => Some(replicas),
            ServiceMode::Global => None,
        };
        state.services.push(StubService {
            id: id.clone(),
            name: spec.name.clone(),
            replicas,
        });
        Ok(id)
    }

    async fn inspect_service(&self, name: &str) -> EngineResult<ServiceDetails> {
        let mut state = self.lock();
        state.enter("inspect_service")?;
        state
            .services
            .iter()
            .find(|s| matches_ref(&s.name, &s.id, name))
            .map(service_details)
            .ok_or_else(|| not_found("service", name))
    }

    async fn remove_service(&self, id: &str) -> EngineResult<()> {
        let mut state = self.lock();
        state.enter("remove_service")?;
        let before = state.services.len();
        state.services.retain(|s| !matches_ref(&s.name, &s.id, id));
        if state.services.len() == before {
            return Err(not_found("service", id));
        }
        Ok(())
    }

    async fn scale_service(&self, name: &str, replicas: u64) -> EngineResult<()> {
        let mut state = self.lock();
        state.enter("scale_service")?;
        let service = state
            .services
            .iter_mut()
            .find(|s| matches_ref(&s.name, &s.id, name))
            .ok_or_else(|| not_found("service", name))?;
        match service.replicas.as_mut() {
            Some(current) => {
                *current = replicas;
                Ok(())
            }
            None => Err(EngineError::InvalidArgument(
                "Cannot scale a service that is not in replicated mode".to_string(),
            )),
        }
    }

    async fn service_tasks(&self, service_id: &str) -> EngineResult<Vec<serde_json::Value>> {
        let mut state = self.lock();
        state.enter("service_tasks")?;
        let Some(service) = state.services.iter().find(|s| s.id == service_id) else {
            return Ok(Vec::new());
        };
        let count = service.replicas.unwrap_or(1);
        Ok((1..=count)
            .map(|slot| {
                json!({
                    "ID": format!("{}-task-{slot}", service.id),
                    "ServiceID": service.id,
                    "Slot": slot,
                    "Status": { "State": "running" },
                })
            })
            .collect())
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> EngineResult<VolumeDetails> {
        let mut state = self.lock();
        state.enter("create_volume")?;
        let name = match &spec.name {
            Some(name) => name.clone(),
            None => state.new_id(),
        };
        if let Some(existing) = state.volumes.iter().find(|v| v.name == name) {
            return Ok(volume_details(existing));
        }
        let volume = StubVolume {
            name,
            driver: spec.driver.clone().unwrap_or_else(|| "local".to_string()),
            labels: spec.labels.clone().unwrap_or_default(),
        };
        let details = volume_details(&volume);
        state.volumes.push(volume);
        Ok(details)
    }

    async fn inspect_volume(&self, name: &str) -> EngineResult<VolumeDetails> {
        let mut state = self.lock();
        state.enter("inspect_volume")?;
        state
            .volumes
            .iter()
            .find(|v| v.name == name)
            .map(volume_details)
            .ok_or_else(|| not_found("volume", name))
    }

    async fn remove_volume(&self, name: &str, force: bool) -> EngineResult<()> {
        let mut state = self.lock();
        state.enter("remove_volume")?;
        let before = state.volumes.len();
        state.volumes.retain(|v| v.name != name);
        if state.volumes.len() == before {
            return Err(not_found("volume", name));
        }
        state.removed_volumes.push((name.to_string(), force));
        Ok(())
    }

    async fn list_volumes(&self) -> EngineResult<Vec<VolumeDetails>> {
        let mut state = self.lock();
        state.enter("list_volumes")?;
        Ok(state.volumes.iter().map(volume_details).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_records_calls() {
        let engine = StubEngine::new().with_container("web", "running");
        assert_eq!(engine.calls(), 0);

        let details = engine.inspect_container("web").await.unwrap();
        assert_eq!(details.status, ContainerStatus::Running);
        assert_eq!(engine.calls_to("inspect_container"), 1);
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_stub_resolves_id_prefix() {
        let engine = StubEngine::new().with_container("web", "exited");
        let id = engine.container_id("web").unwrap();

        let details = engine.inspect_container(&id[..12]).await.unwrap();
        assert_eq!(details.id, id);
    }

    #[tokio::test]
    async fn test_stub_failure_toggle() {
        let engine = StubEngine::new();
        engine.set_failure(Some(StubFailure::Api));
        assert!(matches!(
            engine.ping().await,
            Err(EngineError::Api {
                status_code: 500,
                ..
            })
        ));

        engine.set_failure(None);
        assert!(engine.ping().await.is_ok());
        assert_eq!(engine.calls_to("ping"), 2);
    }

    #[tokio::test]
    async fn test_stub_ids_are_distinct() {
        let engine = StubEngine::new()
            .with_container("a", "running")
            .with_container("b", "running");
        let a = engine.container_id("a").unwrap();
        let b = engine.container_id("b").unwrap();
        assert_ne!(a[..12], b[..12]);
    }

    #[test]
    fn test_stub_stop_marks_exited() {
        let engine = StubEngine::new().with_container("web", "running");
        let id = engine.container_id("web").unwrap();

        tokio_test::block_on(engine.stop_container(&id)).unwrap();
        assert_eq!(engine.container_status("web").as_deref(), Some("exited"));
    }
}
