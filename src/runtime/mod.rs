//! The container runtime seen as a small capability set.
//!
//! Scopes only ever need to create-and-start a container, kill it, remove it,
//! inspect it and read its logs. [`ContainerRuntime`] captures exactly that so
//! the lifecycle logic can run against Docker ([`DockerRuntime`]) or against
//! an in-memory double ([`crate::testing::FakeRuntime`]).

mod detect;
mod docker;
mod error;

pub use detect::{DockerDetection, DockerStatus, Platform, check_docker};
pub use docker::{DockerRuntime, connect_docker};
pub use error::{Result, RuntimeError};

use std::collections::BTreeMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::{Map, Value};

/// Stream of raw log chunks (stdout and stderr interleaved).
pub type LogStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Everything needed to create and start one detached container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRequest {
    /// Image reference, e.g. `postgres:alpine`.
    pub image: String,
    /// Container name; must be unique on the daemon.
    pub name: String,
    /// Published ports: `"5432/tcp"` → host port.
    pub ports: BTreeMap<String, u16>,
    /// In-memory (tmpfs) mounts: container path → mount options.
    pub mounts: BTreeMap<String, String>,
    /// Run with extended privileges.
    pub privileged: bool,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Command override. `None` keeps the image default.
    pub command: Option<Vec<String>>,
    /// Extra Engine API create-body fields, forwarded verbatim.
    pub extra: Map<String, Value>,
}

/// Snapshot of a container's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Runtime-assigned identifier.
    pub id: String,
    /// Container name, without a leading slash.
    pub name: String,
    /// Image the container was created from.
    pub image: Option<String>,
    /// Whether the main process is running.
    pub running: bool,
    /// Runtime status string ("running", "exited", ...).
    pub status: Option<String>,
    /// Host ports actually bound, per `"port/proto"`.
    pub host_ports: BTreeMap<String, Vec<u16>>,
}

impl ContainerInfo {
    /// First host port published for `container_port` (`"6379"` or `"6379/tcp"`).
    pub fn host_port(&self, container_port: &str) -> Option<u16> {
        self.host_ports
            .get(&port_key(container_port))
            .and_then(|ports| ports.first().copied())
    }
}

/// Normalize `"5432"` to `"5432/tcp"`.
pub(crate) fn port_key(port: &str) -> String {
    if port.contains('/') {
        port.to_string()
    } else {
        format!("{port}/tcp")
    }
}

/// Operations a scope needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start a detached container. Returns its id.
    ///
    /// On error nothing is left behind on the runtime.
    async fn create_and_run(&self, request: &CreateRequest) -> Result<String>;

    /// Forcefully stop the container (SIGKILL).
    async fn kill(&self, name: &str) -> Result<()>;

    /// Remove the container and its anonymous volumes.
    async fn remove(&self, name: &str) -> Result<()>;

    /// Inspect the container.
    async fn inspect(&self, name: &str) -> Result<ContainerInfo>;

    /// Stream the container's logs. With `follow`, the stream stays open
    /// until the container stops.
    fn logs(&self, name: &str, follow: bool) -> LogStream;
}
