//! Engine availability check with platform-specific guidance.
//!
//! Backs the `swarmgate check` command: it reports whether the `docker`
//! binary is installed and whether the daemon answers a ping, and suggests
//! how to fix it when it does not.

use crate::engine::ContainerEngine;

/// Container engine availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Daemon answered the ping.
    Available,
    /// No daemon answered and no `docker` binary is on PATH.
    NotInstalled,
    /// Binary found (or remote host configured) but the daemon is not answering.
    NotRunning,
}

impl EngineStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, EngineStatus::Available)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::Available => "available",
            EngineStatus::NotInstalled => "not installed",
            EngineStatus::NotRunning => "not running",
        }
    }
}

/// Operating system family the gateway runs on. Decides which remediation
/// steps `swarmgate check` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Docker Desktop hosts: macOS and Windows.
    Desktop,
    /// Hosts running the engine as a system service.
    Server,
}

/// Shared last step: services and tasks need a swarm manager.
const SWARM_STEP: &str = "Enable swarm mode so service routes work: docker swarm init";

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value. Unknown systems are treated as servers.
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" | "windows" => Self::Desktop,
            _ => Self::Server,
        }
    }

    /// Steps that bring the engine to a state the gateway can use.
    /// Empty when nothing needs fixing.
    pub fn fix_steps(self, status: EngineStatus) -> Vec<&'static str> {
        let steps: &[&'static str] = match (self, status) {
            (_, EngineStatus::Available) => &[],
            (Self::Desktop, EngineStatus::NotInstalled) => &[
                "Install Docker Desktop: https://docs.docker.com/desktop/",
                "Or point DOCKER_HOST at a remote engine",
            ],
            (Self::Server, EngineStatus::NotInstalled) => &[
                "Install Docker Engine: https://docs.docker.com/engine/install/",
                "Or point DOCKER_HOST at a remote engine",
            ],
            (Self::Desktop, EngineStatus::NotRunning) => &["Start Docker Desktop"],
            (Self::Server, EngineStatus::NotRunning) => &[
                "Start the daemon: sudo systemctl start docker",
                "Check that this user can read the socket (docker group)",
            ],
        };
        let mut steps = steps.to_vec();
        if !steps.is_empty() {
            steps.push(SWARM_STEP);
        }
        steps
    }
}

/// Outcome of [`check_engine`].
#[derive(Debug, Clone)]
pub struct EngineDetection {
    pub status: EngineStatus,
    pub platform: Platform,
    /// Ping failure detail when the engine is not available.
    pub detail: Option<String>,
}

/// Ping the engine; when that fails, look for a local `docker` binary to
/// tell "not running" apart from "not installed".
///
/// A remote `DOCKER_HOST` counts as installed: there is nothing to install
/// locally in that case.
pub async fn check_engine(engine: &dyn ContainerEngine) -> EngineDetection {
    let platform = Platform::current();

    let err = match engine.ping().await {
        Ok(()) => {
            return EngineDetection {
                status: EngineStatus::Available,
                platform,
                detail: None,
            };
        }
        Err(e) => e,
    };

    let status = if docker_binary_exists() || std::env::var_os("DOCKER_HOST").is_some() {
        EngineStatus::NotRunning
    } else {
        EngineStatus::NotInstalled
    };

    EngineDetection {
        status,
        platform,
        detail: Some(err.to_string()),
    }
}

fn docker_binary_exists() -> bool {
    let finder = if cfg!(windows) { "where" } else { "which" };
    std::process::Command::new(finder)
        .arg("docker")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::testing::{StubEngine, StubFailure};

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("macos"), Platform::Desktop);
        assert_eq!(Platform::from_os("windows"), Platform::Desktop);
        assert_eq!(Platform::from_os("linux"), Platform::Server);
        assert_eq!(Platform::from_os("freebsd"), Platform::Server);
    }

    #[test]
    fn test_fix_steps_for_status() {
        assert!(Platform::Server.fix_steps(EngineStatus::Available).is_empty());

        let steps = Platform::Server.fix_steps(EngineStatus::NotRunning);
        assert!(steps[0].contains("systemctl start docker"));
        assert_eq!(steps.last(), Some(&SWARM_STEP));

        let steps = Platform::Desktop.fix_steps(EngineStatus::NotInstalled);
        assert!(steps[0].contains("Docker Desktop"));
        assert!(steps.iter().any(|s| s.contains("DOCKER_HOST")));
        assert_eq!(steps.last(), Some(&SWARM_STEP));
    }

    #[test]
    fn test_engine_status_display() {
        assert_eq!(EngineStatus::Available.as_str(), "available");
        assert_eq!(EngineStatus::NotInstalled.as_str(), "not installed");
        assert_eq!(EngineStatus::NotRunning.as_str(), "not running");
        assert!(EngineStatus::Available.is_ok());
        assert!(!EngineStatus::NotRunning.is_ok());
    }

    #[tokio::test]
    async fn test_check_engine_available() {
        let engine = StubEngine::new();
        let detection = check_engine(&engine).await;
        assert_eq!(detection.status, EngineStatus::Available);
        assert!(detection.detail.is_none());
        assert_eq!(engine.calls_to("ping"), 1);
    }

    #[tokio::test]
    async fn test_check_engine_unreachable() {
        let engine = StubEngine::new();
        engine.set_failure(Some(StubFailure::Unavailable));

        let detection = check_engine(&engine).await;
        assert!(matches!(
            detection.status,
            EngineStatus::NotRunning | EngineStatus::NotInstalled
        ));
        let detail = detection.detail.unwrap();
        assert_eq!(
            detail,
            EngineError::Unavailable("stub engine unavailable".to_string()).to_string()
        );
    }
}
