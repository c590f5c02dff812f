use std::path::PathBuf;

use crate::error::PlatformError;

const APP_DIR: &str = "diaglink";

/// Where diaglink keeps its files.
pub trait PlatformPaths: Send + Sync {
    /// Holds `config.toml`.
    fn config_dir(&self) -> PathBuf;
    /// Relative log file paths are resolved against this directory.
    fn log_dir(&self) -> PathBuf;
}

/// [`PlatformPaths`] resolved from the user's environment.
///
/// Uses the platform's config and data directories (`$XDG_CONFIG_HOME`,
/// `~/Library/Application Support`, ...) when `dirs` knows them, and the
/// XDG layout under `$HOME` otherwise.
#[derive(Debug, Clone)]
pub struct DefaultPaths {
    config_root: PathBuf,
    data_root: PathBuf,
}

impl DefaultPaths {
    pub fn new() -> Result<Self, PlatformError> {
        let home = dirs::home_dir().or_else(|| std::env::var_os("HOME").map(PathBuf::from));
        let config_root = dirs::config_dir().or_else(|| home.as_ref().map(|h| h.join(".config")));
        let data_root =
            dirs::data_dir().or_else(|| home.as_ref().map(|h| h.join(".local").join("share")));

        match (config_root, data_root) {
            (Some(config_root), Some(data_root)) => Ok(Self {
                config_root,
                data_root,
            }),
            _ => Err(PlatformError::Path(
                "could not determine config or data directory".into(),
            )),
        }
    }

    /// XDG layout under an explicit home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            config_root: home.join(".config"),
            data_root: home.join(".local").join("share"),
        }
    }
}

impl PlatformPaths for DefaultPaths {
    fn config_dir(&self) -> PathBuf {
        self.config_root.join(APP_DIR)
    }

    fn log_dir(&self) -> PathBuf {
        self.data_root.join(APP_DIR).join("logs")
    }
}
