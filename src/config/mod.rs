//! Environment-driven configuration.
//!
//! Every setting is optional. `Config::from_env()` loads a `.env` file from
//! the working directory (if there is one) and then reads `DOCKERSCOPE_*`
//! variables:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DOCKERSCOPE_DOCKER_HOST` (or `DOCKER_HOST`) | local socket |
//! | `DOCKERSCOPE_API_VERSION` | `auto` |
//! | `DOCKERSCOPE_CONNECT_TIMEOUT_SECS` | `120` |
//! | `DOCKERSCOPE_AUTO_PULL` | `true` |
//! | `DOCKERSCOPE_PROBE_INTERVAL_MS` | `200` |
//! | `DOCKERSCOPE_PROBE_TIMEOUT_SECS` | `20` |

mod helpers;
mod probe;
mod runtime;

pub use helpers::Lookup;
pub use probe::ProbeConfig;
pub use runtime::{ApiVersion, RuntimeConfig};

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

/// Full configuration for opening container scopes.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Runtime connection settings.
    pub runtime: RuntimeConfig,
    /// Defaults for built-in readiness checks.
    pub probe: ProbeConfig,
}

impl Config {
    /// Resolve from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&helpers::process_env)
    }

    /// Resolve from the process environment, falling back to values from the
    /// env file at `path`. The process environment is left untouched.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let env_file_error = |e: dotenvy::Error| ConfigError::EnvFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let mut file_vars = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(env_file_error)? {
            let (key, value) = item.map_err(env_file_error)?;
            file_vars.insert(key, value);
        }

        let lookup = |key: &str| -> Result<Option<String>, ConfigError> {
            match helpers::process_env(key)? {
                Some(value) => Ok(Some(value)),
                None => Ok(file_vars.get(key).cloned()),
            }
        };
        Self::from_lookup(&lookup)
    }

    /// Resolve from an arbitrary key lookup.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            runtime: RuntimeConfig::resolve(lookup)?,
            probe: ProbeConfig::resolve(lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn resolve(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        let lookup = move |key: &str| -> Result<Option<String>, ConfigError> {
            Ok(map.get(key).map(|v| v.to_string()))
        };
        Config::from_lookup(&lookup)
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = resolve(&[]).unwrap();
        assert_eq!(config.runtime.docker_host, None);
        assert_eq!(config.runtime.api_version, ApiVersion::Auto);
        assert_eq!(config.runtime.connect_timeout_secs, 120);
        assert!(config.runtime.auto_pull);
        assert_eq!(config.probe, ProbeConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = resolve(&[
            ("DOCKERSCOPE_API_VERSION", "1.24"),
            ("DOCKERSCOPE_AUTO_PULL", "false"),
            ("DOCKERSCOPE_PROBE_INTERVAL_MS", "50"),
            ("DOCKERSCOPE_PROBE_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(
            config.runtime.api_version,
            ApiVersion::Pinned {
                major: 1,
                minor: 24
            }
        );
        assert!(!config.runtime.auto_pull);
        assert_eq!(config.probe.interval_ms, 50);
        assert_eq!(config.probe.timeout_secs, 5);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = resolve(&[("DOCKERSCOPE_PROBE_INTERVAL_MS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "DOCKERSCOPE_PROBE_INTERVAL_MS"
        ));
    }

    #[test]
    fn test_rejects_bad_api_version() {
        let err = resolve(&[("DOCKERSCOPE_API_VERSION", "latest")]).unwrap_err();
        assert!(err.to_string().contains("DOCKERSCOPE_API_VERSION"));
    }

    #[test]
    fn test_env_file_fills_unset_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# probe tuning").unwrap();
        writeln!(file, "DOCKERSCOPE_PROBE_TIMEOUT_SECS=45").unwrap();
        writeln!(file, "DOCKERSCOPE_UNUSED_TEST_KEY=1").unwrap();
        drop(file);

        let config = Config::from_env_file(&path).unwrap();
        if std::env::var_os("DOCKERSCOPE_PROBE_TIMEOUT_SECS").is_none() {
            assert_eq!(config.probe.timeout_secs, 45);
        }
        assert!(std::env::var_os("DOCKERSCOPE_UNUSED_TEST_KEY").is_none());
    }

    #[test]
    fn test_missing_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_env_file(dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { .. }));
    }
}
