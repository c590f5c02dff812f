use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted key, e.g. `server.port`.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly named config file does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The commented default config could not be written.
    #[error("cannot write default config {}: {source}", path.display())]
    CreateDefault {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A layer is not valid TOML or does not match the schema.
    #[error("{origin}: {message}")]
    Parse {
        /// File path, or `<string>` for inline text.
        origin: String,
        message: String,
    },

    /// The merged configuration breaks one or more rules.
    #[error("invalid configuration: {}", join_issues(.0))]
    Invalid(Vec<FieldError>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_issues(issues: &[FieldError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
