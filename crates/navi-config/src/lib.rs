pub mod config;
pub mod error;
pub mod load;
pub mod merge;
pub mod validate;

pub use config::{Config, DebuggerConfig, LogConfig, LogLevel, NotificationConfig, KNOWN_CHANNELS};
pub use error::ConfigError;
pub use load::{load_config, load_from_str};
