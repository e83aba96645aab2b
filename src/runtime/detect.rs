//! Docker daemon detection with platform-specific guidance.
//!
//! Used to decide up front whether container scopes can run at all (for
//! example to skip integration tests on machines without Docker) and to give
//! a useful hint when they cannot.

use crate::config::RuntimeConfig;
use crate::runtime::docker::connect_docker;

/// Docker daemon availability status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerStatus {
    /// Daemon reachable and answering pings.
    Available,
    /// Daemon could not be reached.
    NotRunning {
        /// Why the connection failed.
        reason: String,
    },
}

impl DockerStatus {
    /// Returns true if Docker is available and ready.
    pub fn is_ok(&self) -> bool {
        matches!(self, DockerStatus::Available)
    }

    /// Human-readable status string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DockerStatus::Available => "available",
            DockerStatus::NotRunning { .. } => "not running",
        }
    }
}

/// Host platform for startup guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
}

impl Platform {
    /// Detect the current platform.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::MacOS,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    /// Instructions to start the Docker daemon on this platform.
    pub fn start_hint(&self) -> &'static str {
        match self {
            Platform::MacOS => "Start Docker Desktop from Applications, or run: open -a Docker",
            Platform::Linux => "Start the Docker daemon: sudo systemctl start docker",
            Platform::Windows => "Start Docker Desktop from the Start menu",
        }
    }
}

/// Result of a Docker detection check.
#[derive(Debug, Clone)]
pub struct DockerDetection {
    pub status: DockerStatus,
    pub platform: Platform,
}

impl DockerDetection {
    /// One-line summary suitable for a skip message or an error report.
    pub fn summary(&self) -> String {
        match &self.status {
            DockerStatus::Available => "Docker is available".to_string(),
            DockerStatus::NotRunning { reason } => {
                format!("Docker is not running ({reason}). {}", self.platform.start_hint())
            }
        }
    }
}

/// Check whether the daemon described by `config` is reachable.
pub async fn check_docker(config: &RuntimeConfig) -> DockerDetection {
    let platform = Platform::current();

    let status = match connect_docker(config).await {
        Ok(_) => DockerStatus::Available,
        Err(e) => DockerStatus::NotRunning {
            reason: e.to_string(),
        },
    };

    DockerDetection { status, platform }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_platform() {
        let platform = Platform::current();
        match platform {
            Platform::MacOS | Platform::Linux | Platform::Windows => {}
        }
    }

    #[test]
    fn test_start_hint_not_empty() {
        for platform in [Platform::MacOS, Platform::Linux, Platform::Windows] {
            assert!(!platform.start_hint().is_empty());
        }
    }

    #[test]
    fn test_docker_status_display() {
        assert_eq!(DockerStatus::Available.as_str(), "available");
        let down = DockerStatus::NotRunning {
            reason: "refused".to_string(),
        };
        assert_eq!(down.as_str(), "not running");
        assert!(!down.is_ok());
        assert!(DockerStatus::Available.is_ok());
    }

    #[test]
    fn test_summary_includes_hint() {
        let detection = DockerDetection {
            status: DockerStatus::NotRunning {
                reason: "no docker socket found".to_string(),
            },
            platform: Platform::Linux,
        };
        let summary = detection.summary();
        assert!(summary.contains("no docker socket found"));
        assert!(summary.contains("systemctl"));
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_not_running() {
        let config = RuntimeConfig {
            docker_host: Some("unix:///nonexistent/dockerscope.sock".to_string()),
            connect_timeout_secs: 1,
            ..Default::default()
        };
        let detection = check_docker(&config).await;
        assert!(!detection.status.is_ok());
    }
}
