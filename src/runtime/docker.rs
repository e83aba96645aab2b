//! Docker implementation of [`ContainerRuntime`] on top of bollard.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, KillContainerOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::{API_DEFAULT_VERSION, ClientVersion, Docker};
use futures::StreamExt;
use serde_json::{Map, Value};

use crate::config::{ApiVersion, RuntimeConfig};
use crate::runtime::error::{Result, RuntimeError};
use crate::runtime::{ContainerInfo, ContainerRuntime, CreateRequest, LogStream, port_key};

/// Connect to the Docker daemon described by `config` and ping it.
///
/// With no explicit host, tries the standard socket, then the Docker Desktop
/// socket under the home directory, then the rootless socket under
/// `$XDG_RUNTIME_DIR`. With [`ApiVersion::Auto`] the client negotiates the
/// API version with the daemon.
pub async fn connect_docker(config: &RuntimeConfig) -> Result<Docker> {
    let timeout = config.connect_timeout_secs;
    let pinned;
    let version: &ClientVersion = match config.api_version {
        ApiVersion::Auto => API_DEFAULT_VERSION,
        ApiVersion::Pinned { major, minor } => {
            pinned = ClientVersion {
                major_version: major,
                minor_version: minor,
            };
            &pinned
        }
    };

    let docker = match config.docker_host.as_deref() {
        Some(host) => connect_to_host(host, timeout, version)?,
        None => connect_local(timeout, version).await?,
    };

    let docker = match config.api_version {
        ApiVersion::Auto => {
            docker
                .negotiate_version()
                .await
                .map_err(|e| RuntimeError::DockerNotAvailable {
                    reason: format!("version negotiation failed: {e}"),
                })?
        }
        ApiVersion::Pinned { .. } => docker,
    };

    docker
        .ping()
        .await
        .map_err(|e| RuntimeError::DockerNotAvailable {
            reason: e.to_string(),
        })?;

    tracing::debug!(api_version = %config.api_version, "Connected to Docker");
    Ok(docker)
}

fn connect_to_host(host: &str, timeout: u64, version: &ClientVersion) -> Result<Docker> {
    let result = if let Some(path) = host.strip_prefix("unix://") {
        Docker::connect_with_local(path, timeout, version)
    } else if let Some(pipe) = host.strip_prefix("npipe://") {
        Docker::connect_with_local(pipe, timeout, version)
    } else if host.starts_with("tcp://") || host.starts_with("http://") {
        Docker::connect_with_http(host, timeout, version)
    } else {
        return Err(RuntimeError::Config {
            reason: format!("unsupported docker host '{host}'"),
        });
    };

    result.map_err(|e| RuntimeError::DockerNotAvailable {
        reason: format!("{host}: {e}"),
    })
}

async fn connect_local(timeout: u64, version: &ClientVersion) -> Result<Docker> {
    let mut last_error = String::from("no docker socket found");

    for candidate in local_socket_candidates() {
        if cfg!(unix) && !candidate.exists() {
            continue;
        }
        let path = candidate.to_string_lossy();
        match Docker::connect_with_local(&path, timeout, version) {
            Ok(docker) => match docker.ping().await {
                Ok(_) => return Ok(docker),
                Err(e) => {
                    tracing::debug!(socket = %path, error = %e, "Docker socket did not answer ping");
                    last_error = format!("{path}: {e}");
                }
            },
            Err(e) => {
                tracing::debug!(socket = %path, error = %e, "Could not open Docker socket");
                last_error = format!("{path}: {e}");
            }
        }
    }

    Err(RuntimeError::DockerNotAvailable { reason: last_error })
}

#[cfg(unix)]
fn local_socket_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("/var/run/docker.sock")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".docker/run/docker.sock"));
    }
    if let Some(runtime_dir) = std::env::var_os("XDG_RUNTIME_DIR") {
        candidates.push(PathBuf::from(runtime_dir).join("docker.sock"));
    }
    candidates
}

#[cfg(not(unix))]
fn local_socket_candidates() -> Vec<PathBuf> {
    vec![PathBuf::from("//./pipe/docker_engine")]
}

/// [`ContainerRuntime`] backed by a Docker daemon.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
    auto_pull: bool,
}

impl DockerRuntime {
    /// Wrap an already connected client.
    pub fn new(docker: Docker) -> Self {
        Self {
            docker,
            auto_pull: true,
        }
    }

    /// Connect using `config`.
    pub async fn connect(config: &RuntimeConfig) -> Result<Self> {
        let docker = connect_docker(config).await?;
        Ok(Self {
            docker,
            auto_pull: config.auto_pull,
        })
    }

    /// Whether missing images are pulled before creating a container.
    pub fn with_auto_pull(mut self, auto_pull: bool) -> Self {
        self.auto_pull = auto_pull;
        self
    }

    /// The underlying bollard client, for calls outside the capability set.
    pub fn client(&self) -> &Docker {
        &self.docker
    }

    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.docker.inspect_image(image).await.is_ok() {
            tracing::debug!("Image '{}' exists locally", image);
            return Ok(());
        }

        if !self.auto_pull {
            return Err(RuntimeError::ImageNotFound {
                image: image.to_string(),
            });
        }

        tracing::info!("Pulling image: {}", image);

        let options = CreateImageOptions {
            from_image: image.to_string(),
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
                Err(e) => {
                    return Err(RuntimeError::ImagePullFailed {
                        image: image.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!("Pulled image: {}", image);
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_and_run(&self, request: &CreateRequest) -> Result<String> {
        self.ensure_image(&request.image).await?;

        let body = build_create_body(request)?;
        let options = CreateContainerOptions {
            name: request.name.clone(),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), body)
            .await
            .map_err(|e| match status_code(&e) {
                Some(404) => RuntimeError::ImageNotFound {
                    image: request.image.clone(),
                },
                Some(409) => RuntimeError::NameConflict {
                    name: request.name.clone(),
                },
                _ => RuntimeError::CreationFailed {
                    name: request.name.clone(),
                    reason: e.to_string(),
                },
            })?;

        for warning in &response.warnings {
            tracing::warn!("Docker warning for '{}': {}", request.name, warning);
        }

        if let Err(e) = self
            .docker
            .start_container(&response.id, None::<StartContainerOptions<String>>)
            .await
        {
            // Leave nothing behind when the start fails.
            if let Err(cleanup) = self
                .docker
                .remove_container(
                    &response.id,
                    Some(RemoveContainerOptions {
                        force: true,
                        v: true,
                        ..Default::default()
                    }),
                )
                .await
            {
                tracing::warn!(
                    "Failed to remove container '{}' after start failure: {}",
                    request.name,
                    cleanup
                );
            }
            return Err(RuntimeError::StartFailed {
                name: request.name.clone(),
                reason: e.to_string(),
            });
        }

        Ok(response.id)
    }

    async fn kill(&self, name: &str) -> Result<()> {
        match self
            .docker
            .kill_container(name, None::<KillContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            // Already stopped.
            Err(e) if status_code(&e) == Some(409) => {
                tracing::debug!("Container '{}' was not running: {}", name, e);
                Ok(())
            }
            Err(e) => Err(request_error("kill", name, e)),
        }
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    v: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| request_error("remove", name, e))
    }

    async fn inspect(&self, name: &str) -> Result<ContainerInfo> {
        let info = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| request_error("inspect", name, e))?;

        let state = info.state.unwrap_or_default();
        let host_ports = info
            .network_settings
            .and_then(|n| n.ports)
            .unwrap_or_default()
            .into_iter()
            .map(|(port, bindings)| {
                let host: Vec<u16> = bindings
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|b| b.host_port.and_then(|p| p.parse().ok()))
                    .collect();
                (port, host)
            })
            .collect();

        Ok(ContainerInfo {
            id: info.id.unwrap_or_default(),
            name: info
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| name.to_string()),
            image: info.config.and_then(|c| c.image),
            running: state.running.unwrap_or(false),
            status: state.status.map(|s| s.to_string()),
            host_ports,
        })
    }

    fn logs(&self, name: &str, follow: bool) -> LogStream {
        let options = LogsOptions::<String> {
            follow,
            stdout: true,
            stderr: true,
            ..Default::default()
        };
        let stream = self.docker.logs(name, Some(options));
        let name = name.to_string();
        Box::pin(stream.map(move |chunk| {
            chunk
                .map(|output| output.into_bytes())
                .map_err(|e| request_error("read logs of", &name, e))
        }))
    }
}

fn status_code(err: &BollardError) -> Option<u16> {
    match err {
        BollardError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

fn request_error(operation: &'static str, name: &str, err: BollardError) -> RuntimeError {
    if status_code(&err) == Some(404) {
        return RuntimeError::NotFound {
            name: name.to_string(),
        };
    }
    RuntimeError::Request {
        operation,
        name: name.to_string(),
        reason: err.to_string(),
    }
}

/// Build the Engine API create body for `request`, merging the extra
/// options over the typed fields.
fn build_create_body(request: &CreateRequest) -> Result<Config<String>> {
    let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = request
        .ports
        .iter()
        .map(|(container_port, host_port)| {
            (
                port_key(container_port),
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(host_port.to_string()),
                }]),
            )
        })
        .collect();

    let exposed_ports: HashMap<String, HashMap<(), ()>> = request
        .ports
        .keys()
        .map(|container_port| (port_key(container_port), HashMap::new()))
        .collect();

    let env: Vec<String> = request
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let host_config = HostConfig {
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        tmpfs: (!request.mounts.is_empty())
            .then(|| request.mounts.clone().into_iter().collect()),
        privileged: Some(request.privileged),
        // Removal is explicit so teardown can observe it.
        auto_remove: Some(false),
        ..Default::default()
    };

    let config = Config {
        image: Some(request.image.clone()),
        env: (!env.is_empty()).then_some(env),
        cmd: request.command.clone(),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        host_config: Some(host_config),
        ..Default::default()
    };

    if request.extra.is_empty() {
        return Ok(config);
    }

    let mut body = serde_json::to_value(&config).map_err(|e| RuntimeError::Config {
        reason: format!("cannot encode create body: {e}"),
    })?;
    merge_extra_options(&mut body, &request.extra);
    serde_json::from_value(body).map_err(|e| RuntimeError::Config {
        reason: format!("invalid extra options for '{}': {e}", request.name),
    })
}

/// Overlay `extra` onto a create body. Top-level keys replace, except
/// `HostConfig`, whose keys are merged one by one.
fn merge_extra_options(body: &mut Value, extra: &Map<String, Value>) {
    let Some(body) = body.as_object_mut() else {
        return;
    };

    for (key, value) in extra {
        match (key.as_str(), body.get_mut(key), value) {
            ("HostConfig", Some(Value::Object(existing)), Value::Object(overrides)) => {
                for (k, v) in overrides {
                    existing.insert(k.clone(), v.clone());
                }
            }
            _ => {
                body.insert(key.clone(), value.clone());
            }
        }
    }
}
