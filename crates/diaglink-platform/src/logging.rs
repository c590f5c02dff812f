//! Log-file housekeeping.
//!
//! The `tracing-subscriber` setup itself lives in the binary crate; this
//! module only prepares the file it writes to.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::PlatformError;
use crate::paths::PlatformPaths;

/// Size at which `diaglink.log` is rotated (5 MB).
pub const DEFAULT_MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Number of rotated log files kept next to the active one.
pub const DEFAULT_MAX_LOG_FILES: u32 = 3;

/// Location of a configured log file. Absolute paths are kept; relative
/// ones are placed under the platform log directory.
pub fn log_file_path(paths: &dyn PlatformPaths, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        paths.log_dir().join(configured)
    }
}

/// Ensure the parent directory of a log file exists.
pub fn ensure_log_dir(log_path: &Path) -> io::Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Rotate `log_path` once it reaches `max_size` bytes.
///
/// ```text
///   diaglink.log   -> diaglink.log.1
///   diaglink.log.1 -> diaglink.log.2
///   diaglink.log.<max_files> is deleted
/// ```
pub fn rotate_log_files(log_path: &Path, max_size: u64, max_files: u32) -> io::Result<()> {
    if !log_path.exists() || fs::metadata(log_path)?.len() < max_size {
        return Ok(());
    }

    let oldest = rotated_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for i in (1..max_files).rev() {
        let from = rotated_path(log_path, i);
        if from.exists() {
            fs::rename(&from, rotated_path(log_path, i + 1))?;
        }
    }
    fs::rename(log_path, rotated_path(log_path, 1))?;
    tracing::debug!("rotated log file {}", log_path.display());
    Ok(())
}

/// Prepare and open a log file for appending: create its directory, rotate
/// it if oversized, then open it.
///
/// # Errors
///
/// Returns `PlatformError::LogFile` when any of those steps fails.
pub fn open_log_file(log_path: &Path) -> Result<File, PlatformError> {
    ensure_log_dir(log_path)?;
    rotate_log_files(log_path, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES)?;
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;
    Ok(file)
}

/// Environment variable whose value replaces the configured level.
pub const LOG_ENV_VAR: &str = "DIAGLINK_LOG";

/// Filter directive for the subscriber.
///
/// A non-blank `env_override` (full `EnvFilter` syntax, e.g.
/// `diaglink_lsp=trace`) wins. Otherwise the configured level name is
/// normalized; unknown names become `"info"`.
pub fn filter_directive(level: &str, env_override: Option<&str>) -> String {
    if let Some(directive) = env_override.map(str::trim).filter(|d| !d.is_empty()) {
        return directive.to_string();
    }
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };
    level.to_string()
}

fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let name = base.file_name().unwrap_or_default().to_string_lossy();
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}.{}", name, index))
}
