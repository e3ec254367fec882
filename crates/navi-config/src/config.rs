use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// LISTEN/NOTIFY channels the database triggers publish on.
pub const KNOWN_CHANNELS: [&str; 5] = [
    "comment_changes",
    "view_changes",
    "function_changes",
    "types_changes",
    "type_instances_changes",
];

/// Log verbosity level.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug messages, including skipped stale notifications.
    Debug,
    /// Informational messages (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The lowercase name used in config files and filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Where the debug agent listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuggerConfig {
    /// Host name or IP address of the debug agent.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port of the debug agent.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Socket read timeout in milliseconds; 0 blocks indefinitely.
    #[serde(default)]
    pub read_timeout_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2222
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout_ms: 0,
        }
    }
}

/// Database change-notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Whether the notification poller runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delay between two polls of the listen channel, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Channels to LISTEN on.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    500
}

fn default_channels() -> Vec<String> {
    KNOWN_CHANNELS.iter().map(|c| c.to_string()).collect()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval(),
            channels: default_channels(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Optional path to a log file; stderr when absent.
    pub file: Option<PathBuf>,
}

/// Top-level naviwire configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Debug agent connection.
    #[serde(default)]
    pub debugger: DebuggerConfig,
    /// Change-notification poller.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.debugger.host, "127.0.0.1");
        assert_eq!(cfg.debugger.port, 2222);
        assert_eq!(cfg.debugger.read_timeout_ms, 0);
        assert!(cfg.notifications.enabled);
        assert_eq!(cfg.notifications.poll_interval_ms, 500);
        assert_eq!(cfg.notifications.channels.len(), 5);
        assert_eq!(cfg.log.level, LogLevel::Info);
        assert!(cfg.log.file.is_none());
    }

    #[test]
    fn serde_roundtrip_preserves_values() {
        let cfg = Config {
            debugger: DebuggerConfig {
                host: "10.0.0.5".into(),
                port: 7000,
                read_timeout_ms: 1500,
            },
            notifications: NotificationConfig {
                enabled: false,
                poll_interval_ms: 250,
                channels: vec!["comment_changes".into()],
            },
            log: LogConfig {
                level: LogLevel::Debug,
                file: Some(PathBuf::from("/tmp/naviwire.log")),
            },
        };

        let toml_str = toml::to_string(&cfg).expect("serialize");
        let deserialized: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn parse_partial_toml_keeps_defaults() {
        let input = r#"
[debugger]
port = 4000

[notifications]
channels = ["view_changes", "types_changes"]
"#;
        let cfg: Config = toml::from_str(input).unwrap();
        assert_eq!(cfg.debugger.port, 4000);
        assert_eq!(cfg.debugger.host, "127.0.0.1");
        assert_eq!(cfg.notifications.channels, vec!["view_changes", "types_changes"]);
        assert_eq!(cfg.notifications.poll_interval_ms, 500);
    }

    #[test]
    fn log_level_names_match_serde() {
        let cfg: LogConfig = toml::from_str("level = \"warn\"").unwrap();
        assert_eq!(cfg.level, LogLevel::Warn);
        assert_eq!(cfg.level.as_str(), "warn");
    }
}
