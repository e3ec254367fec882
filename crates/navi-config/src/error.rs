use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading, merging or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The commented default file could not be written on first run.
    #[error("cannot write default config {}: {source}", path.display())]
    CreateDefault {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file or fragment is not valid TOML for [`Config`](crate::Config).
    #[error("malformed config: {0}")]
    Parse(String),

    /// One setting is out of range.
    #[error("{field}: {message}")]
    Validation {
        /// Dotted key, e.g. `notifications.poll_interval_ms`.
        field: String,
        message: String,
    },

    /// Every violation found in a merged config.
    #[error("{} invalid setting(s): {}", .0.len(), list(.0))]
    Invalid(Vec<ConfigError>),

    #[error("config I/O failed: {0}")]
    Io(#[from] io::Error),
}

fn list(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
