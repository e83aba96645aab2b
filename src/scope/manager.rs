//! Scoped container lifecycle: create, wait until ready, lend, tear down.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::config::{Config, RuntimeConfig};
use crate::readiness::ReadinessCheck;
use crate::runtime::{ContainerRuntime, DockerRuntime, RuntimeError};
use crate::scope::error::ScopeError;
use crate::scope::handle::{ContainerHandle, Lifecycle};
use crate::scope::spec::ContainerSpec;

/// Opens container scopes against one runtime.
///
/// Holds no registry of containers: every scope owns exactly one container
/// and its own teardown, so scopes on different tasks never contend.
#[derive(Clone)]
pub struct ContainerManager {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerManager {
    /// Use an existing runtime.
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Connect to Docker with `config`.
    pub async fn connect(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let runtime = DockerRuntime::connect(config).await?;
        Ok(Self::new(Arc::new(runtime)))
    }

    /// Connect to Docker with settings from the environment.
    pub async fn from_env() -> Result<Self, RuntimeError> {
        let config = Config::from_env().map_err(|e| RuntimeError::Config {
            reason: e.to_string(),
        })?;
        Self::connect(&config.runtime).await
    }

    /// The runtime scopes are opened against.
    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// Run `body` against a fresh container and always clean it up.
    ///
    /// 1. Resolve the name (a generator is called once) and create and start
    ///    the container. Failure here is returned as
    ///    [`ScopeError::Creation`] without any teardown.
    /// 2. Run `readiness`, if given. If it reports failure the container is
    ///    torn down and [`ScopeError::ReadinessTimeout`] is returned; `body`
    ///    is not called.
    /// 3. Call `body` with a handle to the container.
    /// 4. Kill, then remove, the container exactly once, whatever happened
    ///    in steps 2 and 3 (including panics, which are resumed afterwards).
    ///
    /// A body or readiness error is returned in preference to a teardown
    /// error, which is then only logged.
    pub async fn with_container<T, E, F, Fut>(
        &self,
        spec: &ContainerSpec,
        readiness: Option<ReadinessCheck>,
        body: F,
    ) -> Result<T, ScopeError<E>>
    where
        F: FnOnce(ContainerHandle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let request = spec.to_request();
        let name = request.name.clone();

        tracing::info!("Creating container {} from {}", name, request.image);
        let id = self
            .runtime
            .create_and_run(&request)
            .await
            .map_err(|source| ScopeError::Creation {
                image: request.image.clone(),
                source,
            })?;

        let handle = ContainerHandle::new(id, name.clone(), request.image, Arc::clone(&self.runtime));
        let guard = TeardownGuard::new(handle.clone());

        let outcome = AssertUnwindSafe(run_scope(&handle, readiness, body))
            .catch_unwind()
            .await;
        let teardown = guard.teardown().await;

        match outcome {
            Ok(Ok(value)) => match teardown {
                Ok(()) => Ok(value),
                Err(source) => Err(ScopeError::Teardown { name, source }),
            },
            Ok(Err(err)) => {
                if let Err(e) = teardown {
                    tracing::warn!("Suppressed teardown error for container {}: {}", name, e);
                }
                Err(err)
            }
            Err(panic) => {
                if let Err(e) = teardown {
                    tracing::warn!("Suppressed teardown error for container {}: {}", name, e);
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}

async fn run_scope<T, E, F, Fut>(
    handle: &ContainerHandle,
    readiness: Option<ReadinessCheck>,
    body: F,
) -> Result<T, ScopeError<E>>
where
    F: FnOnce(ContainerHandle) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(check) = readiness {
        let description = check.description().to_string();
        tracing::info!("Waiting for container {} ({})", handle.name(), description);
        if !check.run().await {
            return Err(ScopeError::ReadinessTimeout {
                name: handle.name().to_string(),
                check: description,
            });
        }
    }
    handle.set_lifecycle(Lifecycle::Ready);
    tracing::info!("Container {} ready", handle.name());

    handle.set_lifecycle(Lifecycle::InUse);
    body(handle.clone()).await.map_err(ScopeError::Body)
}

/// Kill then remove. A container that is already gone counts as success.
/// Returns the first real failure; both steps are always attempted.
async fn destroy(handle: &ContainerHandle) -> Result<(), RuntimeError> {
    handle.set_lifecycle(Lifecycle::Terminating);

    // Kill rather than stop: some images ignore SIGTERM and would hold the
    // scope open for the full stop timeout.
    tracing::info!("Stopping container {}", handle.name());
    let killed = match handle.kill().await {
        Err(e) if e.is_not_found() => {
            tracing::debug!("Container {} already gone before kill", handle.name());
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Failed to kill container {}: {}", handle.name(), e);
            Err(e)
        }
        Ok(()) => Ok(()),
    };

    tracing::info!("Removing container {}", handle.name());
    let removed = match handle.remove().await {
        Err(e) if e.is_not_found() => {
            tracing::debug!("Container {} already gone before remove", handle.name());
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Failed to remove container {}: {}", handle.name(), e);
            Err(e)
        }
        Ok(()) => Ok(()),
    };

    killed.and(removed)?;
    handle.set_lifecycle(Lifecycle::Destroyed);
    Ok(())
}

/// Tears the container down if the scope future is dropped before it could.
struct TeardownGuard {
    handle: ContainerHandle,
    armed: bool,
}

impl TeardownGuard {
    fn new(handle: ContainerHandle) -> Self {
        Self {
            handle,
            armed: true,
        }
    }

    /// Stays armed until `destroy` returns, so a scope dropped mid-teardown
    /// still gets cleaned up in the background.
    async fn teardown(mut self) -> Result<(), RuntimeError> {
        let result = destroy(&self.handle).await;
        self.armed = false;
        result
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        tracing::warn!(
            "Scope for container {} dropped before teardown, cleaning up in the background",
            self.handle.name()
        );
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let handle = self.handle.clone();
                runtime.spawn(async move {
                    if let Err(e) = destroy(&handle).await {
                        tracing::warn!("Background teardown of {} failed: {}", handle.name(), e);
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    "No async runtime available, container {} may remain",
                    self.handle.name()
                );
            }
        }
    }
}

/// Open a scope using a Docker runtime configured from the environment.
///
/// ```rust,no_run
/// use dockerscope::{ContainerSpec, ReadinessCheck, with_container};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let spec = ContainerSpec::new("redis:alpine").with_port("6379/tcp", 56379);
///
/// let name = with_container(
///     &spec,
///     Some(ReadinessCheck::tcp("127.0.0.1", 56379)),
///     |container| async move {
///         // Talk to redis on 127.0.0.1:56379 here.
///         Ok::<_, std::io::Error>(container.name().to_string())
///     },
/// )
/// .await?;
/// println!("{name} has been killed and removed");
/// # Ok(())
/// # }
/// ```
pub async fn with_container<T, E, F, Fut>(
    spec: &ContainerSpec,
    readiness: Option<ReadinessCheck>,
    body: F,
) -> Result<T, ScopeError<E>>
where
    F: FnOnce(ContainerHandle) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let manager = ContainerManager::from_env()
        .await
        .map_err(|source| ScopeError::Creation {
            image: spec.image.clone(),
            source,
        })?;
    manager.with_container(spec, readiness, body).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::runtime::{ContainerInfo, CreateRequest, LogStream};
    use crate::testing::FakeRuntime;

    /// Delegates to a [`FakeRuntime`] but takes a while to kill.
    struct SlowKill {
        inner: Arc<FakeRuntime>,
        delay: Duration,
    }

    #[async_trait]
    impl ContainerRuntime for SlowKill {
        async fn create_and_run(&self, request: &CreateRequest) -> crate::runtime::Result<String> {
            self.inner.create_and_run(request).await
        }

        async fn kill(&self, name: &str) -> crate::runtime::Result<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.kill(name).await
        }

        async fn remove(&self, name: &str) -> crate::runtime::Result<()> {
            self.inner.remove(name).await
        }

        async fn inspect(&self, name: &str) -> crate::runtime::Result<ContainerInfo> {
            self.inner.inspect(name).await
        }

        fn logs(&self, name: &str, follow: bool) -> LogStream {
            self.inner.logs(name, follow)
        }
    }

    fn manager(runtime: &Arc<FakeRuntime>) -> ContainerManager {
        ContainerManager::new(Arc::clone(runtime) as Arc<dyn ContainerRuntime>)
    }

    #[tokio::test]
    async fn test_happy_path_kills_then_removes() {
        let runtime = Arc::new(FakeRuntime::new());
        let spec = ContainerSpec::new("alpine").with_name("happy");

        let value = manager(&runtime)
            .with_container(&spec, None, |c| async move {
                assert_eq!(c.lifecycle(), Lifecycle::InUse);
                Ok::<_, String>(42)
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(
            runtime.calls_for("happy"),
            vec!["create", "kill", "remove"]
        );
        assert!(!runtime.is_live("happy"));
    }

    #[tokio::test]
    async fn test_body_removing_container_is_not_a_teardown_error() {
        let runtime = Arc::new(FakeRuntime::new());
        let spec = ContainerSpec::new("alpine").with_name("self-removed");

        let result = manager(&runtime)
            .with_container(&spec, None, |c| async move {
                c.kill().await.map_err(|e| e.to_string())?;
                c.remove().await.map_err(|e| e.to_string())?;
                Ok::<_, String>(())
            })
            .await;

        assert!(result.is_ok());
        assert!(!runtime.is_live("self-removed"));
    }

    #[tokio::test]
    async fn test_teardown_error_surfaces_when_nothing_else_failed() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.set_fail_remove(true);
        let spec = ContainerSpec::new("alpine").with_name("sticky");

        let err = manager(&runtime)
            .with_container(&spec, None, |_| async { Ok::<_, String>(()) })
            .await
            .unwrap_err();

        assert!(matches!(err, ScopeError::Teardown { ref name, .. } if name == "sticky"));
    }

    #[tokio::test]
    async fn test_dropped_scope_is_cleaned_up_in_background() {
        let runtime = Arc::new(FakeRuntime::new());
        let spec = ContainerSpec::new("alpine").with_name("abandoned");
        let mgr = manager(&runtime);

        let scope = mgr.with_container(&spec, None, |_| async {
            std::future::pending::<()>().await;
            Ok::<_, String>(())
        });
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(50), scope).await;
        assert!(timed_out.is_err());

        for _ in 0..100 {
            if !runtime.is_live("abandoned") {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!runtime.is_live("abandoned"));
    }

    #[tokio::test]
    async fn test_scope_dropped_during_teardown_is_still_cleaned_up() {
        let fake = Arc::new(FakeRuntime::new());
        let mgr = ContainerManager::new(Arc::new(SlowKill {
            inner: Arc::clone(&fake),
            delay: Duration::from_millis(100),
        }));
        let spec = ContainerSpec::new("alpine").with_name("cut-short");

        // The body returns at once, so the timeout fires while kill is pending.
        let scope = mgr.with_container(&spec, None, |_| async { Ok::<_, String>(()) });
        let timed_out = tokio::time::timeout(Duration::from_millis(20), scope).await;
        assert!(timed_out.is_err());
        assert!(fake.is_live("cut-short"));

        for _ in 0..50 {
            if !fake.is_live("cut-short") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!fake.is_live("cut-short"));
        assert!(fake.calls_for("cut-short").ends_with(&["kill", "remove"]));
    }
}
