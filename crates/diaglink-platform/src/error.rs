use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// A standard directory could not be resolved.
    #[error("path error: {0}")]
    Path(String),

    /// Preparing, rotating or opening the log file failed.
    #[error("log file error: {0}")]
    LogFile(#[from] std::io::Error),
}
