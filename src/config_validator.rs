use crate::config::Config;
use crate::error::{PacerError, PacerResult};
use crate::rate_limit_policy::MAX_WINDOW;
use reqwest::header::HeaderName;
use validator::Validate;

/// Validates configuration objects for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a whole configuration
    pub fn validate_config(config: &Config) -> PacerResult<()> {
        config
            .validate()
            .map_err(|e| PacerError::Validation(e.to_string()))?;

        Self::validate_header_name(&config.policy_header)?;
        Self::validate_log_level(&config.log_level)?;

        if config.default_window > MAX_WINDOW {
            return Err(PacerError::Validation(format!(
                "Default window {:?} exceeds the maximum of {:?}",
                config.default_window, MAX_WINDOW
            )));
        }

        Ok(())
    }

    /// Validates the name of the policy header
    pub fn validate_header_name(name: &str) -> PacerResult<()> {
        if name.trim().is_empty() {
            return Err(PacerError::Validation(
                "Policy header name cannot be empty".to_string(),
            ));
        }

        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            PacerError::Validation(format!("'{}' is not a valid HTTP header name", name))
        })?;

        Ok(())
    }

    /// Validates log level name
    pub fn validate_log_level(level: &str) -> PacerResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(PacerError::Validation(format!(
                "Invalid log level '{}'. Must be one of: {:?}",
                level, valid_levels
            )));
        }

        Ok(())
    }
}
