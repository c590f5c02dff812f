//! Platform services for diaglink: well-known directories and log-file
//! housekeeping.
pub mod error;
pub mod logging;
pub mod paths;

pub use error::PlatformError;
pub use logging::{filter_directive, log_file_path, open_log_file, LOG_ENV_VAR};
pub use paths::{DefaultPaths, PlatformPaths};
