//! What to run: image, name and run options for one scoped container.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::runtime::CreateRequest;

/// How a scope names its container.
///
/// Generators are invoked exactly once per scope. Names must be unique
/// among containers running at the same time; the default generator
/// guarantees that, custom generators must.
#[derive(Clone)]
pub enum InstanceName {
    /// Use this name verbatim.
    Literal(String),
    /// Call this to produce a name.
    Generator(Arc<dyn Fn() -> String + Send + Sync>),
}

impl InstanceName {
    /// A literal name.
    pub fn literal(name: impl Into<String>) -> Self {
        InstanceName::Literal(name.into())
    }

    /// A name generator. The result is converted to a string.
    pub fn generator<F, S>(generate: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: ToString,
    {
        InstanceName::Generator(Arc::new(move || generate().to_string()))
    }

    /// A random 32-character hex token.
    pub fn random() -> Self {
        Self::generator(|| uuid::Uuid::new_v4().simple().to_string())
    }

    /// Produce the concrete name for one scope.
    pub fn resolve(&self) -> String {
        match self {
            InstanceName::Literal(name) => name.clone(),
            InstanceName::Generator(generate) => generate(),
        }
    }
}

impl Default for InstanceName {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Debug for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceName::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
            InstanceName::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

impl From<&str> for InstanceName {
    fn from(name: &str) -> Self {
        InstanceName::literal(name)
    }
}

impl From<String> for InstanceName {
    fn from(name: String) -> Self {
        InstanceName::Literal(name)
    }
}

/// Image and run options for a scoped container.
///
/// ```rust
/// use dockerscope::ContainerSpec;
///
/// let spec = ContainerSpec::new("postgres:alpine")
///     .with_port("5432/tcp", 55432)
///     .with_env("POSTGRES_PASSWORD", "password")
///     .with_tmpfs("/var/lib/postgresql/data", "rw");
/// assert_eq!(spec.ports["5432/tcp"], 55432);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    /// Image reference.
    pub image: String,
    /// Container name, literal or generated. Random by default.
    pub name: InstanceName,
    /// Published ports: `"5432/tcp"` → host port. A bare `"5432"` means TCP.
    pub ports: BTreeMap<String, u16>,
    /// In-memory mounts: container path → tmpfs options (e.g. `"rw,size=64m"`).
    pub mounts: BTreeMap<String, String>,
    /// Run privileged.
    pub privileged: bool,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Command override.
    pub command: Option<Vec<String>>,
    /// Anything else, as Engine API create-body fields (`"WorkingDir"`,
    /// `"Labels"`, `"HostConfig": {"ShmSize": ...}`), forwarded verbatim.
    pub extra: Map<String, Value>,
}

impl ContainerSpec {
    /// Spec for `image` with a random name and no options.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Set the container name.
    pub fn with_name(mut self, name: impl Into<InstanceName>) -> Self {
        self.name = name.into();
        self
    }

    /// Publish `container_port` on `host_port`.
    pub fn with_port(mut self, container_port: impl Into<String>, host_port: u16) -> Self {
        self.ports.insert(container_port.into(), host_port);
        self
    }

    /// Mount an in-memory filesystem at `path`.
    pub fn with_tmpfs(mut self, path: impl Into<String>, options: impl Into<String>) -> Self {
        self.mounts.insert(path.into(), options.into());
        self
    }

    /// Run privileged.
    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Override the image command.
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    /// Forward an extra create-body field verbatim.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Resolve the name and build the runtime request.
    pub(crate) fn to_request(&self) -> CreateRequest {
        CreateRequest {
            image: self.image.clone(),
            name: self.name.resolve(),
            ports: self.ports.clone(),
            mounts: self.mounts.clone(),
            privileged: self.privileged,
            env: self.env.clone(),
            command: self.command.clone(),
            extra: self.extra.clone(),
        }
    }
}
