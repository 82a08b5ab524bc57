use crate::error::{PacerError, PacerResult};
use crate::rate_limit_policy::RateLimitPolicy;
use crate::retry::RetryPolicy;
use humantime_serde::re::humantime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Counted attempts before a failing request is given up on
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: u32,

    /// Requests per window until the server advertises its own policy
    #[validate(range(min = 1))]
    pub default_request_limit: u32,

    /// Window length until the server advertises its own policy
    #[serde(with = "humantime_serde")]
    pub default_window: Duration,

    /// Response header carrying `<limit>;w=<seconds>`
    #[validate(length(min = 1))]
    pub policy_header: String,

    /// Status that means "slow down" rather than "failed"
    #[validate(range(min = 400, max = 599))]
    pub throttle_status: u16,

    /// Prefix for relative paths given to the API client
    #[validate(url)]
    pub base_url: Option<String>,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_request_limit: 1,
            default_window: Duration::from_secs(1),
            policy_header: "ratelimit-policy".to_string(),
            throttle_status: 429,
            base_url: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `PACER_*` environment variables
    pub fn from_env() -> PacerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> PacerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PacerError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            PacerError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> PacerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let default_window = match lookup("PACER_WINDOW") {
            Some(raw) => humantime::parse_duration(raw.trim()).map_err(|e| {
                PacerError::Configuration(format!("Invalid PACER_WINDOW '{}': {}", raw, e))
            })?,
            None => defaults.default_window,
        };

        Ok(Self {
            max_attempts: parse_var(&lookup, "PACER_MAX_ATTEMPTS", defaults.max_attempts)?,
            default_request_limit: parse_var(
                &lookup,
                "PACER_REQUEST_LIMIT",
                defaults.default_request_limit,
            )?,
            default_window,
            policy_header: lookup("PACER_POLICY_HEADER").unwrap_or(defaults.policy_header),
            throttle_status: parse_var(&lookup, "PACER_THROTTLE_STATUS", defaults.throttle_status)?,
            base_url: lookup("PACER_BASE_URL").or(defaults.base_url),
            log_level: lookup("PACER_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Policy the scheduler starts with before learning one
    pub fn initial_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.default_request_limit, self.default_window)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.throttle_status)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> PacerResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PacerError::Configuration(format!("Invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.initial_policy(), RateLimitPolicy::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PACER_MAX_ATTEMPTS", "5"),
            ("PACER_REQUEST_LIMIT", "2"),
            ("PACER_WINDOW", "250ms"),
            ("PACER_POLICY_HEADER", "x-ratelimit-policy"),
            ("PACER_BASE_URL", "https://api.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.default_request_limit, 2);
        assert_eq!(config.default_window, Duration::from_millis(250));
        assert_eq!(config.policy_header, "x-ratelimit-policy");
        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn test_invalid_environment_values() {
        let err = Config::from_lookup(lookup_from(&[("PACER_MAX_ATTEMPTS", "many")])).unwrap_err();
        assert!(matches!(err, PacerError::Configuration(_)));

        let err = Config::from_lookup(lookup_from(&[("PACER_WINDOW", "soon")])).unwrap_err();
        assert!(matches!(err, PacerError::Configuration(_)));
    }

    #[test]
    fn test_json_uses_humantime_and_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "default_window": "2s", "max_attempts": 4 }"#).unwrap();
        assert_eq!(config.default_window, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.throttle_status, 429);
    }

    #[test]
    fn test_derive_validation() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            max_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            base_url: Some("not a url".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
