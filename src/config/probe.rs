use crate::config::helpers::{Lookup, parse_optional_env};
use crate::error::ConfigError;

/// Default settings for the built-in TCP and HTTP readiness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Delay between attempts, in milliseconds.
    pub interval_ms: u64,
    /// Overall readiness budget, in seconds.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            timeout_secs: 20,
        }
    }
}

impl ProbeConfig {
    pub(crate) fn resolve(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let interval_ms = parse_optional_env(
            lookup,
            "DOCKERSCOPE_PROBE_INTERVAL_MS",
            defaults.interval_ms,
        )?;
        if interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DOCKERSCOPE_PROBE_INTERVAL_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            interval_ms,
            timeout_secs: parse_optional_env(
                lookup,
                "DOCKERSCOPE_PROBE_TIMEOUT_SECS",
                defaults.timeout_secs,
            )?,
        })
    }
}
