use thiserror::Error;

/// Errors from resolving per-user directories.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Neither the OS nor `$HOME` named a home directory.
    #[error("cannot determine the home directory; set HOME")]
    NoHome,
}
