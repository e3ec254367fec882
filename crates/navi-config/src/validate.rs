use std::collections::HashSet;

use crate::config::{Config, KNOWN_CHANNELS};
use crate::error::ConfigError;

/// Smallest accepted poll interval; anything lower hammers the database.
const MIN_POLL_INTERVAL_MS: u64 = 50;

/// Validate a [`Config`], returning all detected violations.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.debugger.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            field: "debugger.host".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    if config.debugger.port == 0 {
        errors.push(ConfigError::Validation {
            field: "debugger.port".to_string(),
            message: "must not be 0".to_string(),
        });
    }

    if config.notifications.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        errors.push(ConfigError::Validation {
            field: "notifications.poll_interval_ms".to_string(),
            message: format!(
                "must be \u{2265} {MIN_POLL_INTERVAL_MS}, got {}",
                config.notifications.poll_interval_ms
            ),
        });
    }

    let mut seen = HashSet::new();
    for channel in &config.notifications.channels {
        if !KNOWN_CHANNELS.contains(&channel.as_str()) {
            errors.push(ConfigError::Validation {
                field: "notifications.channels".to_string(),
                message: format!("unknown channel '{channel}'"),
            });
        } else if !seen.insert(channel.as_str()) {
            errors.push(ConfigError::Validation {
                field: "notifications.channels".to_string(),
                message: format!("channel '{channel}' listed twice"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
