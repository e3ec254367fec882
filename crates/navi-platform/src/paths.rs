//! Where naviwire looks for its config file and writes its logs.
//!
//! Both follow the OS conventions reported by `dirs`: on Linux that is
//! `$XDG_CONFIG_HOME/naviwire` and `$XDG_DATA_HOME/naviwire/logs`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PlatformError;

const APP_DIR: &str = "naviwire";

/// Per-user directories.
pub trait PlatformPaths {
    /// Holds `config.toml`.
    fn config_dir(&self) -> PathBuf;
    /// Relative log file names are placed here.
    fn log_dir(&self) -> PathBuf;
}

/// The directories of the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPaths {
    config: PathBuf,
    logs: PathBuf,
}

impl DefaultPaths {
    /// Resolves the user's config and data bases.
    ///
    /// # Errors
    ///
    /// [`PlatformError::NoHome`] when the OS names neither.
    pub fn new() -> Result<Self, PlatformError> {
        let config = dirs::config_dir().ok_or(PlatformError::NoHome)?;
        let data = dirs::data_local_dir().ok_or(PlatformError::NoHome)?;
        let paths = Self::from_bases(config, data);
        debug!(
            config = %paths.config.display(),
            logs = %paths.logs.display(),
            "resolved user directories"
        );
        Ok(paths)
    }

    /// Places naviwire's directories under explicit config and data bases.
    pub fn from_bases(config_base: impl AsRef<Path>, data_base: impl AsRef<Path>) -> Self {
        Self {
            config: config_base.as_ref().join(APP_DIR),
            logs: data_base.as_ref().join(APP_DIR).join("logs"),
        }
    }
}

impl PlatformPaths for DefaultPaths {
    fn config_dir(&self) -> PathBuf {
        self.config.clone()
    }

    fn log_dir(&self) -> PathBuf {
        self.logs.clone()
    }
}
