//! Pass-through shapes exchanged with the container engine.

use std::collections::HashMap;

/// Number of characters kept by [`short_id`].
pub const SHORT_ID_LEN: usize = 12;

/// Abbreviate an engine id the way the Docker CLI does.
pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// A container to create and start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
}

/// CPU and memory limits applied to every task of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// CPU limit in units of 10^-9 CPUs.
    pub cpu_limit: i64,
    /// Memory limit in bytes.
    pub mem_limit: i64,
}

/// Scheduling mode of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    Replicated { replicas: u64 },
    Global,
}

/// How a service's published ports are load balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    /// Virtual IP in front of the tasks.
    Vip,
    /// DNS round robin across task addresses.
    Dnsrr,
}

/// Published port to target port mapping (TCP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub published: u16,
    pub target: u16,
}

/// Networking of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub mode: EndpointMode,
    pub ports: Vec<PortMapping>,
}

impl EndpointSpec {
    /// VIP endpoint publishing port 80 onto container port 80.
    ///
    /// Every service created through the gateway gets this endpoint,
    /// whatever endpoint spec the caller sent.
    pub fn fixed_http() -> Self {
        Self {
            mode: EndpointMode::Vip,
            ports: vec![PortMapping {
                published: 80,
                target: 80,
            }],
        }
    }
}

/// A replicated service to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub image: String,
    pub mode: ServiceMode,
    pub resources: ResourceLimits,
    /// Labels applied to the service's containers.
    pub container_labels: Option<HashMap<String, String>>,
    /// Labels applied to the service itself.
    pub service_labels: Option<HashMap<String, String>>,
    pub endpoint: EndpointSpec,
}

/// A volume to create. Unset fields fall back to engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeSpec {
    pub name: Option<String>,
    pub driver: Option<String>,
    pub labels: Option<HashMap<String, String>>,
}

/// Container state as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Exited,
    /// Any other state (`paused`, `restarting`, `removing`, `dead`, ...).
    Other(String),
}

impl ContainerStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "created" => Self::Created,
            "running" => Self::Running,
            "exited" => Self::Exited,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Exited => "exited",
            Self::Other(status) => status,
        }
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inspected container.
#[derive(Debug, Clone)]
pub struct ContainerDetails {
    pub id: String,
    pub status: ContainerStatus,
    /// Full attribute object as returned by the engine.
    pub attrs: serde_json::Value,
}

impl ContainerDetails {
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

/// An inspected service.
#[derive(Debug, Clone)]
pub struct ServiceDetails {
    pub id: String,
    pub attrs: serde_json::Value,
}

impl ServiceDetails {
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

/// An inspected volume. Volumes are identified by name.
#[derive(Debug, Clone)]
pub struct VolumeDetails {
    pub name: String,
    pub attrs: serde_json::Value,
}

impl VolumeDetails {
    pub fn short_id(&self) -> String {
        short_id(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_truncates() {
        assert_eq!(
            short_id("4f9d2c1a7b3e8d6f0a1b2c3d4e5f60718293a4b5c6d7e8f9"),
            "4f9d2c1a7b3e"
        );
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id(""), "");
    }

    #[test]
    fn test_container_status_parse() {
        assert_eq!(ContainerStatus::parse("running"), ContainerStatus::Running);
        assert_eq!(ContainerStatus::parse("exited"), ContainerStatus::Exited);
        assert_eq!(ContainerStatus::parse("created"), ContainerStatus::Created);
        assert_eq!(
            ContainerStatus::parse("paused"),
            ContainerStatus::Other("paused".to_string())
        );
        assert_eq!(ContainerStatus::parse("restarting").to_string(), "restarting");
    }

    #[test]
    fn test_fixed_http_endpoint() {
        let endpoint = EndpointSpec::fixed_http();
        assert_eq!(endpoint.mode, EndpointMode::Vip);
        assert_eq!(
            endpoint.ports,
            vec![PortMapping {
                published: 80,
                target: 80
            }]
        );
    }
}
