//! The one error a scope reports to its caller.

use thiserror::Error;

use crate::runtime::RuntimeError;

/// Why a scope failed.
///
/// At most one of these reaches the caller. Readiness and body errors always
/// win over a teardown error; a teardown error is only returned when
/// everything before it succeeded. Suppressed teardown errors are logged.
#[derive(Debug, Error)]
pub enum ScopeError<E> {
    /// The container could not be created or started. Nothing was left
    /// running, so no teardown happened.
    #[error("Failed to create container from '{image}': {source}")]
    Creation {
        /// Image reference.
        image: String,
        /// Runtime failure.
        #[source]
        source: RuntimeError,
    },

    /// The readiness check gave up. The container was torn down and the body
    /// never ran.
    #[error("Container {name} not ready fast enough ({check})")]
    ReadinessTimeout {
        /// Resolved container name.
        name: String,
        /// Description of the check that failed.
        check: String,
    },

    /// The body's own error, unchanged.
    #[error("{0}")]
    Body(E),

    /// Teardown failed after an otherwise successful scope.
    #[error("Failed to tear down container '{name}': {source}")]
    Teardown {
        /// Resolved container name.
        name: String,
        /// Runtime failure.
        #[source]
        source: RuntimeError,
    },
}

impl<E> ScopeError<E> {
    /// The container name, when one had been resolved and created.
    pub fn instance_name(&self) -> Option<&str> {
        match self {
            ScopeError::ReadinessTimeout { name, .. } | ScopeError::Teardown { name, .. } => {
                Some(name)
            }
            ScopeError::Creation { .. } | ScopeError::Body(_) => None,
        }
    }

    /// True if the readiness check failed.
    pub fn is_readiness_timeout(&self) -> bool {
        matches!(self, ScopeError::ReadinessTimeout { .. })
    }

    /// The body's error, if that is what failed.
    pub fn into_body(self) -> Option<E> {
        match self {
            ScopeError::Body(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_message_names_container() {
        let err: ScopeError<std::io::Error> = ScopeError::ReadinessTimeout {
            name: "pg-1".to_string(),
            check: "tcp 127.0.0.1:5432".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Container pg-1 not ready fast enough (tcp 127.0.0.1:5432)"
        );
        assert_eq!(err.instance_name(), Some("pg-1"));
        assert!(err.is_readiness_timeout());
    }

    #[test]
    fn test_body_error_is_unwrapped_unchanged() {
        let err: ScopeError<String> = ScopeError::Body("boom".to_string());
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.into_body().as_deref(), Some("boom"));
    }

    #[test]
    fn test_creation_error_keeps_source() {
        let err: ScopeError<String> = ScopeError::Creation {
            image: "nope:latest".to_string(),
            source: RuntimeError::ImageNotFound {
                image: "nope:latest".to_string(),
            },
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.instance_name(), None);
    }
}
