//! In-memory runtime for exercising scopes without a Docker daemon.
//!
//! Provides:
//! - [`FakeRuntime`]: a [`ContainerRuntime`] that keeps containers in a map,
//!   records every call, and can be told to fail create, kill or remove
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dockerscope::testing::FakeRuntime;
//! use dockerscope::{ContainerManager, ContainerSpec};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let runtime = Arc::new(FakeRuntime::new());
//!     let manager = ContainerManager::new(runtime.clone());
//!     // open scopes, then assert on runtime.calls_for(..) / runtime.is_live(..)
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use crate::runtime::{
    ContainerInfo, ContainerRuntime, CreateRequest, LogStream, Result, RuntimeError,
};

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    image: String,
    running: bool,
    ports: BTreeMap<String, u16>,
}

#[derive(Debug, Default)]
struct FakeState {
    containers: HashMap<String, FakeContainer>,
    calls: Vec<(String, &'static str)>,
    requests: Vec<CreateRequest>,
    next_id: u64,
}

/// A configurable in-memory container runtime for tests.
///
/// Supports:
/// - Call recording via [`calls()`](Self::calls) and [`calls_for()`](Self::calls_for)
/// - Liveness queries via [`is_live()`](Self::is_live)
/// - Runtime failure toggling for create, kill and remove
/// - Fixed log output via [`with_logs()`](Self::with_logs)
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
    logs: Vec<Bytes>,
    fail_create: AtomicBool,
    fail_kill: AtomicBool,
    fail_remove: AtomicBool,
}

impl FakeRuntime {
    /// A runtime where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log chunks every container produces.
    pub fn with_logs<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.logs = chunks.into_iter().map(Into::into).collect();
        self
    }

    /// Toggle whether `create_and_run` fails.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::Relaxed);
    }

    /// Toggle whether `kill` fails.
    pub fn set_fail_kill(&self, fail: bool) {
        self.fail_kill.store(fail, Ordering::Relaxed);
    }

    /// Toggle whether `remove` fails.
    pub fn set_fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::Relaxed);
    }

    /// Every call made, as `(container name, operation)`.
    pub fn calls(&self) -> Vec<(String, &'static str)> {
        self.state().calls.clone()
    }

    /// Operations made against one container, in order.
    pub fn calls_for(&self, name: &str) -> Vec<&'static str> {
        self.state()
            .calls
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, op)| *op)
            .collect()
    }

    /// Every create request received, including failed ones.
    pub fn requests(&self) -> Vec<CreateRequest> {
        self.state().requests.clone()
    }

    /// Whether a container with this name currently exists.
    pub fn is_live(&self, name: &str) -> bool {
        self.state().containers.contains_key(name)
    }

    /// Names of all existing containers, sorted.
    pub fn live_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().containers.keys().cloned().collect();
        names.sort();
        names
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, state: &mut FakeState, name: &str, op: &'static str) {
        tracing::trace!(container = name, op, "Fake runtime call");
        state.calls.push((name.to_string(), op));
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_and_run(&self, request: &CreateRequest) -> Result<String> {
        let mut state = self.state();
        self.record(&mut state, &request.name, "create");
        state.requests.push(request.clone());

        if self.fail_create.load(Ordering::Relaxed) {
            return Err(RuntimeError::CreationFailed {
                name: request.name.clone(),
                reason: "injected create failure".to_string(),
            });
        }
        if state.containers.contains_key(&request.name) {
            return Err(RuntimeError::NameConflict {
                name: request.name.clone(),
            });
        }

        state.next_id += 1;
        let id = format!("fake-{:012x}", state.next_id);
        state.containers.insert(
            request.name.clone(),
            FakeContainer {
                id: id.clone(),
                image: request.image.clone(),
                running: true,
                ports: request.ports.clone(),
            },
        );
        Ok(id)
    }

    async fn kill(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        self.record(&mut state, name, "kill");

        if self.fail_kill.load(Ordering::Relaxed) {
            return Err(RuntimeError::Request {
                operation: "kill",
                name: name.to_string(),
                reason: "injected kill failure".to_string(),
            });
        }
        match state.containers.get_mut(name) {
            Some(container) => {
                container.running = false;
                Ok(())
            }
            None => Err(RuntimeError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        self.record(&mut state, name, "remove");

        if self.fail_remove.load(Ordering::Relaxed) {
            return Err(RuntimeError::Request {
                operation: "remove",
                name: name.to_string(),
                reason: "injected remove failure".to_string(),
            });
        }
        state
            .containers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::NotFound {
                name: name.to_string(),
            })
    }

    async fn inspect(&self, name: &str) -> Result<ContainerInfo> {
        let mut state = self.state();
        self.record(&mut state, name, "inspect");

        let container = state
            .containers
            .get(name)
            .ok_or_else(|| RuntimeError::NotFound {
                name: name.to_string(),
            })?;

        Ok(ContainerInfo {
            id: container.id.clone(),
            name: name.to_string(),
            image: Some(container.image.clone()),
            running: container.running,
            status: Some(if container.running { "running" } else { "exited" }.to_string()),
            host_ports: container
                .ports
                .iter()
                .map(|(port, host)| (crate::runtime::port_key(port), vec![*host]))
                .collect(),
        })
    }

    fn logs(&self, name: &str, _follow: bool) -> LogStream {
        let mut state = self.state();
        self.record(&mut state, name, "logs");

        let chunks: Vec<Result<Bytes>> = if state.containers.contains_key(name) {
            self.logs.iter().cloned().map(Ok).collect()
        } else {
            vec![Err(RuntimeError::NotFound {
                name: name.to_string(),
            })]
        };
        Box::pin(futures::stream::iter(chunks))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn request(name: &str) -> CreateRequest {
        CreateRequest {
            image: "alpine".to_string(),
            name: name.to_string(),
            ports: BTreeMap::from([("6379".to_string(), 56379)]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_name_conflict() {
        let runtime = FakeRuntime::new();
        runtime.create_and_run(&request("a")).await.unwrap();
        let err = runtime.create_and_run(&request("a")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NameConflict { .. }));
    }

    #[tokio::test]
    async fn test_kill_then_remove() {
        let runtime = FakeRuntime::new();
        runtime.create_and_run(&request("a")).await.unwrap();

        runtime.kill("a").await.unwrap();
        assert!(!runtime.inspect("a").await.unwrap().running);

        runtime.remove("a").await.unwrap();
        assert!(runtime.remove("a").await.unwrap_err().is_not_found());
        assert_eq!(runtime.calls_for("a"), vec!["create", "kill", "inspect", "remove", "remove"]);
    }

    #[tokio::test]
    async fn test_inspect_reports_ports() {
        let runtime = FakeRuntime::new();
        runtime.create_and_run(&request("a")).await.unwrap();
        let info = runtime.inspect("a").await.unwrap();
        assert_eq!(info.host_port("6379"), Some(56379));
    }

    #[tokio::test]
    async fn test_logs() {
        let runtime = FakeRuntime::new().with_logs(["hey\n"]);
        runtime.create_and_run(&request("a")).await.unwrap();

        let chunks: Vec<_> = runtime.logs("a", false).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &Bytes::from_static(b"hey\n"));

        let mut missing = runtime.logs("b", false);
        assert!(missing.next().await.unwrap().unwrap_err().is_not_found());
    }
}
