//! Locating, layering and validating config files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

/// Name of the config file in both the global and the project directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Directory holding a project's override, searched upward from the
/// working directory.
pub const PROJECT_DIR: &str = ".naviwire";

const DEFAULT_CONFIG_CONTENT: &str = r#"# naviwire configuration
# Every setting below shows its default. Uncomment to change it.

# [debugger]
# host = "127.0.0.1"
# port = 2222
# read_timeout_ms = 0          # 0 waits forever

# [notifications]
# enabled = true
# poll_interval_ms = 500       # at least 50
# channels = ["view_changes", "function_changes", "comment_changes", "types_changes", "type_instances_changes"]

# [log]
# level = "info"
# file = "naviwire.log"        # relative to the log directory; stderr when unset
"#;

/// Builds the effective config.
///
/// The global `config.toml` in `config_dir` is written with commented
/// defaults on first run. A project override found above `project_dir`
/// is layered on top. The merged result must pass validation; every
/// violation is reported at once.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let global = config_dir.join(CONFIG_FILE);
    if !global.exists() {
        write_default(config_dir, &global)?;
    }

    let mut layers = vec![global];
    layers.extend(project_dir.and_then(find_project_config));

    let mut config = Config::default();
    for path in &layers {
        let content = fs::read_to_string(path)?;
        if is_blank(&content) {
            continue;
        }
        tracing::debug!("applying config layer {}", path.display());
        config = merge_configs(&config, &content).map_err(|e| match e {
            ConfigError::Parse(msg) => ConfigError::Parse(format!("{}: {msg}", path.display())),
            other => other,
        })?;
    }
    checked(config)
}

/// Parses a complete config from TOML text.
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    checked(config)
}

fn checked(config: Config) -> Result<Config, ConfigError> {
    validate(&config).map_err(ConfigError::Invalid)?;
    Ok(config)
}

fn write_default(config_dir: &Path, path: &Path) -> Result<(), ConfigError> {
    fs::create_dir_all(config_dir)
        .and_then(|()| fs::write(path, DEFAULT_CONFIG_CONTENT))
        .map_err(|source| ConfigError::CreateDefault {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!("wrote default config to {}", path.display());
    Ok(())
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_DIR).join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Only blank lines and comments.
fn is_blank(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}
