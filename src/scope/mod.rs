//! Scoped containers: one fresh container per scope, always torn down.
//!
//! # Lifecycle
//!
//! ```text
//!   with_container(spec, readiness, body)
//!         │
//!         ▼
//!   ┌──────────────┐   error    ScopeError::Creation
//!   │ Create+Start │──────────▶ (nothing to clean up)
//!   └──────────────┘
//!         │ Created
//!         ▼
//!   ┌──────────────┐   false    ScopeError::ReadinessTimeout ─┐
//!   │ Readiness    │──────────▶                               │
//!   └──────────────┘                                          │
//!         │ Ready                                             │
//!         ▼                                                   │
//!   ┌──────────────┐   Err / panic                            │
//!   │ body(handle) │─────────────────────────────────────────┐│
//!   └──────────────┘                                         ││
//!         │ InUse                                            ▼▼
//!         ▼                                   ┌─────────────────────────┐
//!         └──────────────────────────────────▶│ Kill, then Remove, once │
//!                                             │ Terminating → Destroyed │
//!                                             └─────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use dockerscope::{ContainerManager, ContainerSpec, ReadinessCheck};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ContainerManager::from_env().await?;
//! let spec = ContainerSpec::new("alpine:latest").with_command(["echo", "hey"]);
//!
//! let first_line = manager
//!     .with_container(&spec, None, |container| async move {
//!         let mut logs = container.logs(true);
//!         logs.next().await.transpose()
//!     })
//!     .await?;
//! assert_eq!(first_line.as_deref(), Some(&b"hey\n"[..]));
//! # Ok(())
//! # }
//! ```

mod error;
mod handle;
mod manager;
mod spec;

pub use error::ScopeError;
pub use handle::{ContainerHandle, Lifecycle};
pub use manager::{ContainerManager, with_container};
pub use spec::{ContainerSpec, InstanceName};
