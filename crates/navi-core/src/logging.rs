//! Log files of long-running decoder sessions.
//!
//! A live `connect` session or a notification poller can stay up for days,
//! so the binary rotates its log file by size before opening it. Library
//! crates only emit `tracing` events; the subscriber is installed by the
//! binary.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Size-based rotation of one log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRotation {
    /// A file at least this large is rotated.
    pub max_bytes: u64,
    /// Rotated generations kept next to the live file.
    pub keep: u32,
}

impl Default for LogRotation {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            keep: 5,
        }
    }
}

impl LogRotation {
    /// Moves `log` to generation 1, shifting older generations up and
    /// dropping the one past `keep`. Returns whether anything moved.
    pub fn rotate(&self, log: &Path) -> io::Result<bool> {
        let len = match fs::metadata(log) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        if len < self.max_bytes {
            return Ok(false);
        }
        if self.keep == 0 {
            fs::remove_file(log)?;
            return Ok(true);
        }

        remove_if_present(&generation(log, self.keep))?;
        for n in (1..self.keep).rev() {
            rename_if_present(&generation(log, n), &generation(log, n + 1))?;
        }
        fs::rename(log, generation(log, 1))?;
        Ok(true)
    }

    /// Creates the log directory, rotates, then opens `log` for appending.
    pub fn open(&self, log: &Path) -> io::Result<File> {
        if let Some(dir) = log.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        self.rotate(log)?;
        OpenOptions::new().create(true).append(true).open(log)
    }
}

/// Generation `n` of `naviwire.log` is `naviwire.log.n`.
fn generation(log: &Path, n: u32) -> PathBuf {
    let mut name = log.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn rename_if_present(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

// ── tests ───────────────────────────────────────────────────────────────────
