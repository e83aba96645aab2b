//! The live container lent to a scope body.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::runtime::{ContainerInfo, ContainerRuntime, LogStream, Result};

/// Where a scoped container is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    /// The runtime acknowledged create and start.
    Created = 0,
    /// The readiness check passed (or none was requested).
    Ready = 1,
    /// The scope body is running.
    InUse = 2,
    /// Teardown has begun.
    Terminating = 3,
    /// Kill and remove both succeeded.
    Destroyed = 4,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Created,
            1 => Lifecycle::Ready,
            2 => Lifecycle::InUse,
            3 => Lifecycle::Terminating,
            _ => Lifecycle::Destroyed,
        }
    }

    /// Lowercase name, for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Created => "created",
            Lifecycle::Ready => "ready",
            Lifecycle::InUse => "in use",
            Lifecycle::Terminating => "terminating",
            Lifecycle::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct HandleInner {
    id: String,
    name: String,
    image: String,
    runtime: Arc<dyn ContainerRuntime>,
    lifecycle: AtomicU8,
}

/// Reference to a container owned by a scope.
///
/// Cloning is cheap and every clone observes the same lifecycle. The scope
/// keeps teardown authority: whatever the body does with its clone, the
/// container is killed and removed when the scope ends.
#[derive(Clone)]
pub struct ContainerHandle {
    inner: Arc<HandleInner>,
}

impl ContainerHandle {
    pub(crate) fn new(
        id: String,
        name: String,
        image: String,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id,
                name,
                image,
                runtime,
                lifecycle: AtomicU8::new(Lifecycle::Created as u8),
            }),
        }
    }

    /// Runtime-assigned container id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Container name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Image the container was created from.
    pub fn image(&self) -> &str {
        &self.inner.image
    }

    /// Current lifecycle stage.
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.inner.lifecycle.load(Ordering::SeqCst))
    }

    pub(crate) fn set_lifecycle(&self, stage: Lifecycle) {
        let previous = self.inner.lifecycle.swap(stage as u8, Ordering::SeqCst);
        tracing::debug!(
            container = %self.inner.name,
            from = %Lifecycle::from_u8(previous),
            to = %stage,
            "Lifecycle transition"
        );
    }

    /// Stream the container's logs; `follow` keeps the stream open.
    pub fn logs(&self, follow: bool) -> LogStream {
        self.inner.runtime.logs(&self.inner.name, follow)
    }

    /// Inspect the container.
    pub async fn inspect(&self) -> Result<ContainerInfo> {
        self.inner.runtime.inspect(&self.inner.name).await
    }

    /// Forcefully stop the container.
    pub async fn kill(&self) -> Result<()> {
        self.inner.runtime.kill(&self.inner.name).await
    }

    /// Remove the container.
    pub async fn remove(&self) -> Result<()> {
        self.inner.runtime.remove(&self.inner.name).await
    }

    /// The runtime that owns the container, for calls beyond this handle.
    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.inner.runtime
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("image", &self.inner.image)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
