//! Small helpers shared by the config sections.

use std::str::FromStr;

use crate::error::ConfigError;

/// Source of configuration values, keyed by variable name.
///
/// `Ok(None)` means "not set". Empty strings are treated as unset by the
/// helpers below.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Result<Option<String>, ConfigError>;

/// Read a variable from the process environment.
pub(crate) fn process_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
            key: key.to_string(),
        }),
    }
}

/// Read an optional variable, treating empty values as unset.
pub(crate) fn optional_env(lookup: Lookup<'_>, key: &str) -> Result<Option<String>, ConfigError> {
    Ok(lookup(key)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// Parse an optional variable, falling back to `default` when unset.
pub(crate) fn parse_optional_env<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(lookup, key)?
        .map(|s| s.parse::<T>())
        .transpose()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
        .map(|v| v.unwrap_or(default))
}

/// Parse an optional boolean variable.
pub(crate) fn parse_bool_env(lookup: Lookup<'_>, key: &str, default: bool) -> Result<bool, ConfigError> {
    optional_env(lookup, key)?
        .map(|s| s.parse::<bool>())
        .transpose()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be 'true' or 'false': {e}"),
        })
        .map(|v| v.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<Option<String>, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| Ok(map.get(key).cloned())
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let lookup = lookup_from(&[("A", "   ")]);
        assert_eq!(optional_env(&lookup, "A").unwrap(), None);
        assert_eq!(parse_optional_env(&lookup, "A", 7u64).unwrap(), 7);
    }

    #[test]
    fn test_parse_errors_name_the_key() {
        let lookup = lookup_from(&[("PORT", "abc"), ("FLAG", "yes")]);

        let err = parse_optional_env(&lookup, "PORT", 0u16).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = parse_bool_env(&lookup, "FLAG", false).unwrap_err();
        assert!(err.to_string().contains("must be 'true' or 'false'"));
    }
}
