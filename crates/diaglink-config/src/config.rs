use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Per-frame protocol traffic.
    Debug,
    /// Connection lifecycle (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The level name as used in filter directives.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Where the diagnostics server listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name or address.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6005
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The project whose files are checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Workspace root sent in the initialize handshake. Defaults to the
    /// current directory when unset.
    pub root: Option<PathBuf>,
    /// Language identifier sent with every opened document.
    #[serde(default = "default_language_id")]
    pub language_id: String,
}

fn default_language_id() -> String {
    "gdscript".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: None,
            language_id: default_language_id(),
        }
    }
}

/// Socket polling cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Milliseconds between two polling ticks (10–10000).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_tick_interval() -> u64 {
    100
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Optional path to a log file. Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

/// Top-level diaglink configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server address.
    #[serde(default)]
    pub server: ServerConfig,
    /// Project settings.
    #[serde(default)]
    pub project: ProjectConfig,
    /// Polling settings.
    #[serde(default)]
    pub poll: PollConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}
