use std::fmt;
use std::str::FromStr;

use crate::config::helpers::{Lookup, optional_env, parse_bool_env, parse_optional_env};
use crate::error::ConfigError;

/// Docker Engine API version selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    /// Ask the daemon which version it speaks.
    #[default]
    Auto,
    /// Always speak this version (e.g. `1.24` for old daemons on CI hosts).
    Pinned {
        /// Major version component.
        major: usize,
        /// Minor version component.
        minor: usize,
    },
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ApiVersion::Auto);
        }
        let (major, minor) = s
            .trim_start_matches('v')
            .split_once('.')
            .ok_or_else(|| format!("expected 'auto' or MAJOR.MINOR, got '{s}'"))?;
        let major = major
            .parse()
            .map_err(|e| format!("bad major version '{major}': {e}"))?;
        let minor = minor
            .parse()
            .map_err(|e| format!("bad minor version '{minor}': {e}"))?;
        Ok(ApiVersion::Pinned { major, minor })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::Auto => write!(f, "auto"),
            ApiVersion::Pinned { major, minor } => write!(f, "{major}.{minor}"),
        }
    }
}

/// How to reach the container runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Daemon address (`unix://`, `tcp://` or `http://`). `None` uses local defaults.
    pub docker_host: Option<String>,
    /// Engine API version to speak.
    pub api_version: ApiVersion,
    /// Per-request timeout for the Docker client, in seconds.
    pub connect_timeout_secs: u64,
    /// Pull the image when it is not present locally.
    pub auto_pull: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_host: None,
            api_version: ApiVersion::Auto,
            connect_timeout_secs: 120,
            auto_pull: true,
        }
    }
}

impl RuntimeConfig {
    pub(crate) fn resolve(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let docker_host = match optional_env(lookup, "DOCKERSCOPE_DOCKER_HOST")? {
            Some(host) => Some(host),
            None => optional_env(lookup, "DOCKER_HOST")?,
        };

        Ok(Self {
            docker_host,
            api_version: parse_optional_env(
                lookup,
                "DOCKERSCOPE_API_VERSION",
                defaults.api_version,
            )?,
            connect_timeout_secs: parse_optional_env(
                lookup,
                "DOCKERSCOPE_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,
            auto_pull: parse_bool_env(lookup, "DOCKERSCOPE_AUTO_PULL", defaults.auto_pull)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_version() {
        assert_eq!("auto".parse::<ApiVersion>().unwrap(), ApiVersion::Auto);
        assert_eq!("AUTO".parse::<ApiVersion>().unwrap(), ApiVersion::Auto);
        assert_eq!(
            "1.24".parse::<ApiVersion>().unwrap(),
            ApiVersion::Pinned {
                major: 1,
                minor: 24
            }
        );
        assert_eq!(
            "v1.41".parse::<ApiVersion>().unwrap(),
            ApiVersion::Pinned {
                major: 1,
                minor: 41
            }
        );
        assert!("1".parse::<ApiVersion>().is_err());
        assert!("one.two".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_api_version_display() {
        assert_eq!(ApiVersion::Auto.to_string(), "auto");
        assert_eq!(
            ApiVersion::Pinned {
                major: 1,
                minor: 24
            }
            .to_string(),
            "1.24"
        );
    }

    #[test]
    fn test_docker_host_prefers_scoped_variable() {
        let lookup = |key: &str| -> Result<Option<String>, ConfigError> {
            Ok(match key {
                "DOCKERSCOPE_DOCKER_HOST" => Some("unix:///tmp/scoped.sock".to_string()),
                "DOCKER_HOST" => Some("tcp://10.0.0.1:2375".to_string()),
                _ => None,
            })
        };
        let config = RuntimeConfig::resolve(&lookup).unwrap();
        assert_eq!(config.docker_host.as_deref(), Some("unix:///tmp/scoped.sock"));
    }

    #[test]
    fn test_docker_host_falls_back_to_standard_variable() {
        let lookup = |key: &str| -> Result<Option<String>, ConfigError> {
            Ok((key == "DOCKER_HOST").then(|| "tcp://10.0.0.1:2375".to_string()))
        };
        let config = RuntimeConfig::resolve(&lookup).unwrap();
        assert_eq!(config.docker_host.as_deref(), Some("tcp://10.0.0.1:2375"));
        assert!(config.auto_pull);
    }
}
