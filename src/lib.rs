//! Scoped, self-cleaning Docker containers.
//!
//! Open a scope with an image and run options, optionally wait until the
//! service inside is reachable, use it, and the container is killed and
//! removed when the scope ends, however it ends.
//!
//! ```rust,no_run
//! use dockerscope::{ContainerManager, ContainerSpec, ReadinessCheck};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ContainerManager::from_env().await?;
//! let spec = ContainerSpec::new("postgres:alpine")
//!     .with_port("5432/tcp", 55432)
//!     .with_env("POSTGRES_PASSWORD", "password");
//!
//! manager
//!     .with_container(
//!         &spec,
//!         Some(ReadinessCheck::tcp("127.0.0.1", 55432)),
//!         |pg| async move {
//!             println!("{} is accepting connections", pg.name());
//!             Ok::<_, std::io::Error>(())
//!         },
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Modules:
//! - [`scope`]: specs, handles and the scope manager
//! - [`readiness`]: polling and TCP/HTTP probes
//! - [`runtime`]: the container runtime seam and its Docker implementation
//! - [`config`]: environment-driven settings
//! - [`testing`]: an in-memory runtime for tests

pub mod config;
pub mod error;
pub mod readiness;
pub mod runtime;
pub mod scope;
pub mod testing;

pub use config::Config;
pub use error::ConfigError;
pub use readiness::{ProbeSettings, ReadinessCheck, poll};
pub use runtime::{ContainerRuntime, DockerRuntime, RuntimeError, check_docker};
pub use scope::{
    ContainerHandle, ContainerManager, ContainerSpec, InstanceName, Lifecycle, ScopeError,
    with_container,
};
