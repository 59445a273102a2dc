//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding the pool capacity.
pub const ENV_POOL_CAPACITY: &str = "CALL_DISPATCH_POOL_CAPACITY";
/// Environment variable holding the shortest call duration in milliseconds.
pub const ENV_MIN_CALL_MS: &str = "CALL_DISPATCH_MIN_CALL_MS";
/// Environment variable holding the longest call duration in milliseconds.
pub const ENV_MAX_CALL_MS: &str = "CALL_DISPATCH_MAX_CALL_MS";
/// Environment variable holding the tier contention policy (`yield` or `wait`).
pub const ENV_CONTENTION: &str = "CALL_DISPATCH_CONTENTION";

/// What a caller does when another caller is already scanning the same tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentionPolicy {
    /// Give up on the tier immediately and escalate to the next one.
    #[default]
    Yield,
    /// Wait for the tier's scan-and-claim section to become available.
    Wait,
}

impl std::fmt::Display for ContentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Yield => "yield",
            Self::Wait => "wait",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ContentionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yield" => Ok(Self::Yield),
            "wait" => Ok(Self::Wait),
            other => Err(format!("unknown contention policy '{other}'")),
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of calls serviced concurrently by the pool.
    pub pool_capacity: usize,
    /// Shortest simulated call duration (inclusive).
    pub min_call_duration: Duration,
    /// Longest simulated call duration (inclusive).
    pub max_call_duration: Duration,
    /// Behavior when a tier is being scanned by another caller.
    pub contention: ContentionPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 10,
            min_call_duration: Duration::from_secs(5),
            max_call_duration: Duration::from_secs(10),
            contention: ContentionPolicy::Yield,
        }
    }
}

impl DispatcherConfig {
    /// Build config from environment variables, falling back to defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let pool_capacity = parse_var(&lookup, ENV_POOL_CAPACITY)?.unwrap_or(defaults.pool_capacity);

        let min_call_duration = parse_var::<u64, _>(&lookup, ENV_MIN_CALL_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.min_call_duration);

        let max_call_duration = parse_var::<u64, _>(&lookup, ENV_MAX_CALL_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_call_duration);

        let contention = parse_var(&lookup, ENV_CONTENTION)?.unwrap_or(defaults.contention);

        let config = Self {
            pool_capacity,
            min_call_duration,
            max_call_duration,
            contention,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the call duration range.
    pub fn with_call_duration(mut self, min: Duration, max: Duration) -> Self {
        self.min_call_duration = min;
        self.max_call_duration = max;
        self
    }

    /// Set the pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Set the contention policy.
    pub fn with_contention(mut self, contention: ContentionPolicy) -> Self {
        self.contention = contention;
        self
    }

    /// Check the config invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pool_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.min_call_duration > self.max_call_duration {
            return Err(ConfigError::InvalidValue {
                key: "call_duration".to_string(),
                message: format!(
                    "min {:?} is greater than max {:?}",
                    self.min_call_duration, self.max_call_duration
                ),
            });
        }
        Ok(())
    }
}

/// Read and parse a single variable. Unset → `Ok(None)`.
pub fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_behavior() {
        let config = DispatcherConfig::default();
        assert_eq!(config.pool_capacity, 10);
        assert_eq!(config.min_call_duration, Duration::from_secs(5));
        assert_eq!(config.max_call_duration, Duration::from_secs(10));
        assert_eq!(config.contention, ContentionPolicy::Yield);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_lookup_gives_defaults() {
        let config = DispatcherConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.pool_capacity, 10);
        assert_eq!(config.contention, ContentionPolicy::Yield);
    }

    #[test]
    fn lookup_overrides() {
        let config = DispatcherConfig::from_lookup(lookup_from(&[
            (ENV_POOL_CAPACITY, "4"),
            (ENV_MIN_CALL_MS, "100"),
            (ENV_MAX_CALL_MS, " 250 "),
            (ENV_CONTENTION, "Wait"),
        ]))
        .unwrap();
        assert_eq!(config.pool_capacity, 4);
        assert_eq!(config.min_call_duration, Duration::from_millis(100));
        assert_eq!(config.max_call_duration, Duration::from_millis(250));
        assert_eq!(config.contention, ContentionPolicy::Wait);
    }

    #[test]
    fn unparsable_value_is_rejected() {
        let err = DispatcherConfig::from_lookup(lookup_from(&[(ENV_POOL_CAPACITY, "ten")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == ENV_POOL_CAPACITY));
    }

    #[test]
    fn parse_var_reports_key_and_value() {
        let lookup = lookup_from(&[("CALL_DISPATCH_CALLS", " 12 "), ("BAD", "-3")]);
        assert_eq!(parse_var::<usize, _>(&lookup, "CALL_DISPATCH_CALLS").unwrap(), Some(12));
        assert_eq!(parse_var::<usize, _>(&lookup, "UNSET").unwrap(), None);

        let err = parse_var::<usize, _>(&lookup, "BAD").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ParseError { ref key, ref value, .. } if key == "BAD" && value == "-3"
        ));
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let err = DispatcherConfig::from_lookup(lookup_from(&[(ENV_POOL_CAPACITY, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn inverted_duration_range_is_invalid() {
        let config = DispatcherConfig::default()
            .with_call_duration(Duration::from_secs(3), Duration::from_secs(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn contention_policy_parsing() {
        assert_eq!("yield".parse::<ContentionPolicy>(), Ok(ContentionPolicy::Yield));
        assert_eq!(" WAIT ".parse::<ContentionPolicy>(), Ok(ContentionPolicy::Wait));
        assert!("spin".parse::<ContentionPolicy>().is_err());
        assert_eq!(ContentionPolicy::Wait.to_string(), "wait");
    }
}
