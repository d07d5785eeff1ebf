//! [`ContainerEngine`] backed by the Docker Engine API through bollard.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerCreateBody, EndpointPortConfig, EndpointPortConfigProtocolEnum,
    EndpointPortConfigPublishModeEnum, EndpointSpec as EngineEndpointSpec, EndpointSpecModeEnum,
    Limit, ServiceSpec as EngineServiceSpec, ServiceSpecMode, ServiceSpecModeReplicated, TaskSpec,
    TaskSpecContainerSpec, TaskSpecResources, VolumeCreateOptions,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, InspectServiceOptions,
    ListTasksOptions, ListVolumesOptions, RemoveVolumeOptions, StartContainerOptions,
    StopContainerOptions, UpdateServiceOptions,
};
use futures::StreamExt;

use crate::config::EngineConfig;
use crate::engine::ContainerEngine;
use crate::engine::types::{
    ContainerDetails, ContainerSpec, ContainerStatus, EndpointMode, ServiceDetails, ServiceMode,
    ServiceSpec, VolumeDetails, VolumeSpec,
};
use crate::error::{EngineError, EngineResult};

/// Volume driver used when the caller does not name one.
const DEFAULT_VOLUME_DRIVER: &str = "local";

/// Docker engine client.
///
/// Cheap to clone; all clones share the same connection pool.
#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using the local defaults (`DOCKER_HOST`, or the platform socket).
    ///
    /// No request is made here; use [`ContainerEngine::ping`] to check the
    /// daemon actually answers.
    pub fn connect(config: &EngineConfig) -> EngineResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Unavailable(e.to_string()))?
            .with_timeout(config.timeout);
        Ok(Self { docker })
    }

    /// Pull an image that is not present locally.
    async fn pull_image(&self, image: &str) -> EngineResult<()> {
        let (from_image, tag) = split_image_reference(image);
        tracing::info!("Pulling image: {}", image);

        let options = CreateImageOptions {
            from_image: Some(from_image.to_string()),
            tag: Some(tag.to_string()).filter(|t| !t.is_empty()),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = info.status {
                        tracing::trace!("Pull status: {}", status);
                    }
                }
                Err(e) => return Err(pull_failure(image, e)),
            }
        }

        tracing::info!("Pulled image: {}", image);
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, BollardError> {
        let options = CreateContainerOptions {
            name: Some(spec.name.clone()),
            ..Default::default()
        };
        let config = ContainerCreateBody {
            image: Some(spec.image.clone()),
            ..Default::default()
        };
        let response = self.docker.create_container(Some(options), config).await?;
        Ok(response.id)
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn ping(&self) -> EngineResult<()> {
        self.docker.ping().await.map_err(classify)?;
        Ok(())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> EngineResult<String> {
        let id = match self.create_container(spec).await {
            Ok(id) => id,
            // 404 on create means the image is not available locally.
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                self.pull_image(&spec.image).await?;
                self.create_container(spec).await.map_err(classify)?
            }
            Err(e) => return Err(classify(e)),
        };

        self.docker
            .start_container(&id, None::<StartContainerOptions>)
            .await
            .map_err(classify)?;

        tracing::info!(container = %spec.name, image = %spec.image, "Started container {}", id);

        let details = self.inspect_container(&id).await?;
        if details.status == ContainerStatus::Exited {
            let code = details
                .attrs
                .pointer("/State/ExitCode")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(0);
            if code != 0 {
                return Err(EngineError::NonZeroExit { id, code });
            }
        }

        Ok(id)
    }

    async fn inspect_container(&self, name: &str) -> EngineResult<ContainerDetails> {
        let response = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(classify)?;

        let attrs = serde_json::to_value(&response)?;
        let status = attrs
            .pointer("/State/Status")
            .and_then(serde_json::Value::as_str)
            .map(ContainerStatus::parse)
            .ok_or_else(|| EngineError::Malformed(format!("container {name} has no state")))?;
        let id = response.id.unwrap_or_else(|| name.to_string());

        Ok(ContainerDetails { id, status, attrs })
    }

    async fn stop_container(&self, id: &str) -> EngineResult<()> {
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await
            .map_err(classify)?;
        tracing::info!("Stopped container {}", id);
        Ok(())
    }

    async fn create_service(&self, spec: &ServiceSpec) -> EngineResult<String> {
        let response = self
            .docker
            .create_service(to_engine_spec(spec), None)
            .await
            .map_err(classify)?;

        let id = response
            .id
            .ok_or_else(|| EngineError::Malformed("service created without an id".to_string()))?;
        tracing::info!(service = %spec.name, "Created service {}", id);
        Ok(id)
    }

    async fn inspect_service(&self, name: &str) -> EngineResult<ServiceDetails> {
        let service = self
            .docker
            .inspect_service(name, None::<InspectServiceOptions>)
            .await
            .map_err(classify)?;

        let attrs = serde_json::to_value(&service)?;
        let id = service.id.unwrap_or_else(|| name.to_string());
        Ok(ServiceDetails { id, attrs })
    }

    async fn remove_service(&self, id: &str) -> EngineResult<()> {
        self.docker.delete_service(id).await.map_err(classify)?;
        tracing::info!("Removed service {}", id);
        Ok(())
    }

    async fn scale_service(&self, name: &str, replicas: u64) -> EngineResult<()> {
        let service = self
            .docker
            .inspect_service(name, None::<InspectServiceOptions>)
            .await
            .map_err(classify)?;

        let id = service.id.unwrap_or_else(|| name.to_string());
        let version = service
            .version
            .and_then(|v| v.index)
            .ok_or_else(|| EngineError::Malformed(format!("service {name} has no version")))?;
        let mut spec = service
            .spec
            .ok_or_else(|| EngineError::Malformed(format!("service {name} has no spec")))?;

        let replicated = spec
            .mode
            .as_mut()
            .and_then(|mode| mode.replicated.as_mut())
            .ok_or_else(|| {
                EngineError::InvalidArgument(
                    "Cannot scale a service that is not in replicated mode".to_string(),
                )
            })?;
        replicated.replicas = Some(replicas_to_i64(replicas));

        let options = UpdateServiceOptions {
            version: i32::try_from(version).map_err(|_| {
                EngineError::Malformed(format!("service {name} version {version} out of range"))
            })?,
            ..Default::default()
        };
        self.docker
            .update_service(&id, spec, options, None)
            .await
            .map_err(classify)?;

        tracing::info!("Scaled service {} to {} replicas", id, replicas);
        Ok(())
    }

    async fn service_tasks(&self, service_id: &str) -> EngineResult<Vec<serde_json::Value>> {
        let options = ListTasksOptions {
            filters: Some(task_filters(service_id)),
        };
        let tasks = self
            .docker
            .list_tasks(Some(options))
            .await
            .map_err(classify)?;

        tasks
            .iter()
            .map(|task| serde_json::to_value(task).map_err(EngineError::from))
            .collect()
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> EngineResult<VolumeDetails> {
        let options = VolumeCreateOptions {
            name: spec.name.clone(),
            driver: Some(
                spec.driver
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VOLUME_DRIVER.to_string()),
            ),
            labels: spec.labels.clone(),
            ..Default::default()
        };

        let volume = self.docker.create_volume(options).await.map_err(classify)?;
        tracing::info!("Created volume {}", volume.name);

        let attrs = serde_json::to_value(&volume)?;
        Ok(VolumeDetails {
            name: volume.name,
            attrs,
        })
    }

    async fn inspect_volume(&self, name: &str) -> EngineResult<VolumeDetails> {
        let volume = self.docker.inspect_volume(name).await.map_err(classify)?;
        let attrs = serde_json::to_value(&volume)?;
        Ok(VolumeDetails {
            name: volume.name,
            attrs,
        })
    }

    async fn remove_volume(&self, name: &str, force: bool) -> EngineResult<()> {
        self.docker
            .remove_volume(name, Some(RemoveVolumeOptions { force }))
            .await
            .map_err(classify)?;
        tracing::info!(force, "Removed volume {}", name);
        Ok(())
    }

    async fn list_volumes(&self) -> EngineResult<Vec<VolumeDetails>> {
        let response = self
            .docker
            .list_volumes(None::<ListVolumesOptions>)
            .await
            .map_err(classify)?;

        response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|volume| -> EngineResult<VolumeDetails> {
                let attrs = serde_json::to_value(&volume)?;
                Ok(VolumeDetails {
                    name: volume.name,
                    attrs,
                })
            })
            .collect()
    }
}

/// Translate a gateway service spec into the engine's service spec.
fn to_engine_spec(spec: &ServiceSpec) -> EngineServiceSpec {
    let mode = match spec.mode {
        ServiceMode::Replicated { replicas } => ServiceSpecMode {
            replicated: Some(ServiceSpecModeReplicated {
                replicas: Some(replicas_to_i64(replicas)),
            }),
            ..Default::default()
        },
        ServiceMode::Global => ServiceSpecMode {
            global: Some(Default::default()),
            ..Default::default()
        },
    };

    let endpoint_mode = match spec.endpoint.mode {
        EndpointMode::Vip => EndpointSpecModeEnum::VIP,
        EndpointMode::Dnsrr => EndpointSpecModeEnum::DNSRR,
    };
    let ports = spec
        .endpoint
        .ports
        .iter()
        .map(|port| EndpointPortConfig {
            protocol: Some(EndpointPortConfigProtocolEnum::TCP),
            target_port: Some(i64::from(port.target)),
            published_port: Some(i64::from(port.published)),
            publish_mode: Some(EndpointPortConfigPublishModeEnum::INGRESS),
            ..Default::default()
        })
        .collect();

    EngineServiceSpec {
        name: Some(spec.name.clone()),
        labels: spec.service_labels.clone(),
        task_template: Some(TaskSpec {
            container_spec: Some(TaskSpecContainerSpec {
                image: Some(spec.image.clone()),
                labels: spec.container_labels.clone(),
                ..Default::default()
            }),
            resources: Some(TaskSpecResources {
                limits: Some(Limit {
                    nano_cpus: Some(spec.resources.cpu_limit),
                    memory_bytes: Some(spec.resources.mem_limit),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        mode: Some(mode),
        endpoint_spec: Some(EngineEndpointSpec {
            mode: Some(endpoint_mode),
            ports: Some(ports),
        }),
        ..Default::default()
    }
}

fn replicas_to_i64(replicas: u64) -> i64 {
    i64::try_from(replicas).unwrap_or(i64::MAX)
}

/// Split an image reference into the repository and tag to pull.
///
/// A reference without a tag pulls `latest`; a digest reference is pulled
/// as-is with an empty tag.
fn split_image_reference(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..name_start + i], &image[name_start + i + 1..]),
        None => (image, "latest"),
    }
}

fn mentions_api_version(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("api version") || message.contains("client version")
}

/// Filters selecting the tasks of one service.
fn task_filters(service_id: &str) -> HashMap<String, Vec<String>> {
    HashMap::from([("service".to_string(), vec![service_id.to_string()])])
}

/// Classify an error from the pull stream. A 404 or an error reported inside
/// the stream means the image cannot be fetched.
fn pull_failure(image: &str, err: BollardError) -> EngineError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message: reason,
        }
        | BollardError::DockerStreamError { error: reason } => EngineError::ImageNotFound {
            image: image.to_string(),
            reason,
        },
        other => classify(other),
    }
}

/// Classify a bollard error.
fn classify(err: BollardError) -> EngineError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => EngineError::NotFound(message),
        BollardError::DockerResponseServerError {
            status_code: 400,
            message,
        } if mentions_api_version(&message) => EngineError::UnsupportedVersion(message),
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::Api {
            status_code,
            message,
        },
        BollardError::DockerStreamError { error } => EngineError::Api {
            status_code: 500,
            message: error,
        },
        e @ BollardError::APIVersionParseError {} => EngineError::UnsupportedVersion(e.to_string()),
        // The daemon answered but the body did not decode.
        e @ (BollardError::JsonDataError { .. }
        | BollardError::JsonSerdeError { .. }
        | BollardError::StrParseError { .. }) => EngineError::Malformed(e.to_string()),
        // No answer from the daemon: socket missing, connection refused, timeout.
        e @ (BollardError::RequestTimeoutError
        | BollardError::IOError { .. }
        | BollardError::HyperResponseError { .. }
        | BollardError::HyperLegacyError { .. }
        | BollardError::SocketNotFoundError(_)) => EngineError::Unavailable(e.to_string()),
        other => EngineError::Client(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{EndpointSpec, PortMapping, ResourceLimits};

    fn web_service() -> ServiceSpec {
        ServiceSpec {
            name: "web".to_string(),
            image: "nginx:1.27".to_string(),
            mode: ServiceMode::Replicated { replicas: 3 },
            resources: ResourceLimits {
                cpu_limit: 500_000_000,
                mem_limit: 64 * 1024 * 1024,
            },
            container_labels: Some(HashMap::from([("tier".to_string(), "front".to_string())])),
            service_labels: None,
            endpoint: EndpointSpec::fixed_http(),
        }
    }

    #[test]
    fn test_engine_spec_replicated_with_fixed_endpoint() {
        let spec = to_engine_spec(&web_service());

        assert_eq!(spec.name.as_deref(), Some("web"));
        let replicas = spec
            .mode
            .as_ref()
            .and_then(|m| m.replicated.as_ref())
            .and_then(|r| r.replicas);
        assert_eq!(replicas, Some(3));

        let endpoint = spec.endpoint_spec.unwrap();
        assert_eq!(endpoint.mode, Some(EndpointSpecModeEnum::VIP));
        let ports = endpoint.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].published_port, Some(80));
        assert_eq!(ports[0].target_port, Some(80));
        assert_eq!(ports[0].protocol, Some(EndpointPortConfigProtocolEnum::TCP));
    }

    #[test]
    fn test_engine_spec_resources_and_labels() {
        let spec = to_engine_spec(&web_service());
        let task = spec.task_template.unwrap();

        let limits = task.resources.unwrap().limits.unwrap();
        assert_eq!(limits.nano_cpus, Some(500_000_000));
        assert_eq!(limits.memory_bytes, Some(64 * 1024 * 1024));

        let container = task.container_spec.unwrap();
        assert_eq!(container.image.as_deref(), Some("nginx:1.27"));
        assert_eq!(
            container.labels.unwrap().get("tier").map(String::as_str),
            Some("front")
        );
        assert!(spec.labels.is_none());
    }

    #[test]
    fn test_engine_spec_dnsrr_and_global() {
        let mut service = web_service();
        service.mode = ServiceMode::Global;
        service.endpoint = EndpointSpec {
            mode: EndpointMode::Dnsrr,
            ports: vec![PortMapping {
                published: 8080,
                target: 80,
            }],
        };

        let spec = to_engine_spec(&service);
        let mode = spec.mode.unwrap();
        assert!(mode.replicated.is_none());
        assert!(mode.global.is_some());
        assert_eq!(
            spec.endpoint_spec.unwrap().mode,
            Some(EndpointSpecModeEnum::DNSRR)
        );
    }

    #[test]
    fn test_split_image_reference() {
        assert_eq!(split_image_reference("nginx"), ("nginx", "latest"));
        assert_eq!(split_image_reference("nginx:1.27"), ("nginx", "1.27"));
        assert_eq!(
            split_image_reference("registry.local:5000/team/app"),
            ("registry.local:5000/team/app", "latest")
        );
        assert_eq!(
            split_image_reference("registry.local:5000/team/app:v2"),
            ("registry.local:5000/team/app", "v2")
        );
        assert_eq!(
            split_image_reference("alpine@sha256:abcd"),
            ("alpine@sha256:abcd", "")
        );
    }

    #[test]
    fn test_classify_server_errors() {
        let not_found = classify(BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: web".to_string(),
        });
        assert!(matches!(not_found, EngineError::NotFound(_)));

        let version = classify(BollardError::DockerResponseServerError {
            status_code: 400,
            message: "client version 1.47 is too new. Maximum supported API version is 1.41"
                .to_string(),
        });
        assert!(matches!(version, EngineError::UnsupportedVersion(_)));

        let bad_request = classify(BollardError::DockerResponseServerError {
            status_code: 400,
            message: "invalid reference format".to_string(),
        });
        assert!(matches!(
            bad_request,
            EngineError::Api {
                status_code: 400,
                ..
            }
        ));

        let swarm = classify(BollardError::DockerResponseServerError {
            status_code: 503,
            message: "This node is not a swarm manager.".to_string(),
        });
        assert!(matches!(
            swarm,
            EngineError::Api {
                status_code: 503,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_connection_failures_as_unavailable() {
        let timeout = classify(BollardError::RequestTimeoutError);
        assert!(matches!(timeout, EngineError::Unavailable(_)));

        let refused = classify(BollardError::IOError {
            err: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        });
        assert!(matches!(refused, EngineError::Unavailable(_)));

        let no_socket = classify(BollardError::SocketNotFoundError(
            "/var/run/docker.sock".to_string(),
        ));
        assert!(matches!(no_socket, EngineError::Unavailable(_)));
    }

    #[test]
    fn test_classify_version_parse_error() {
        let err = classify(BollardError::APIVersionParseError {});
        assert!(matches!(err, EngineError::UnsupportedVersion(_)));
    }

    #[test]
    fn test_classify_undecodable_answer_as_malformed() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = classify(BollardError::JsonSerdeError { err: json_err });
        assert!(matches!(err, EngineError::Malformed(_)));
        assert_eq!(
            crate::error::ErrorKind::from(&err).status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_classify_client_side_error() {
        let err = classify(BollardError::UnsupportedURISchemeError {
            uri: "ftp://docker".to_string(),
        });
        assert!(matches!(err, EngineError::Client(_)));
    }

    #[test]
    fn test_pull_failure_image_errors() {
        let missing = pull_failure(
            "nope:latest",
            BollardError::DockerResponseServerError {
                status_code: 404,
                message: "pull access denied for nope".to_string(),
            },
        );
        assert!(matches!(missing, EngineError::ImageNotFound { ref image, .. } if image == "nope:latest"));

        let in_stream = pull_failure(
            "nope:latest",
            BollardError::DockerStreamError {
                error: "manifest unknown".to_string(),
            },
        );
        assert!(matches!(in_stream, EngineError::ImageNotFound { .. }));
    }

    #[test]
    fn test_pull_failure_keeps_connection_errors() {
        let err = pull_failure("nginx:latest", BollardError::RequestTimeoutError);
        assert!(matches!(err, EngineError::Unavailable(_)));

        let err = pull_failure(
            "nginx:latest",
            BollardError::DockerResponseServerError {
                status_code: 500,
                message: "no space left on device".to_string(),
            },
        );
        assert!(matches!(err, EngineError::Api { status_code: 500, .. }));
    }

    #[test]
    fn test_task_filters_select_service() {
        let filters = task_filters("abc123");
        assert_eq!(filters.len(), 1);
        assert_eq!(filters.get("service"), Some(&vec!["abc123".to_string()]));

        let options = ListTasksOptions {
            filters: Some(filters),
        };
        let encoded = serde_json::to_value(&options).unwrap();
        assert_eq!(encoded["filters"], r#"{"service":["abc123"]}"#);
    }
}
