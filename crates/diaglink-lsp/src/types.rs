//! Diagnostic records and the wire shapes they are decoded from.
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Diagnostic severity, 0-based.
///
/// The protocol numbers severities from 1 (error) to 4 (hint); the domain
/// value is the protocol value minus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error = 0,
    Warning = 1,
    Information = 2,
    Hint = 3,
}

impl Severity {
    /// Convert a 1-based protocol severity.
    ///
    /// Out-of-range values are clamped into `Error..=Hint` so a misbehaving
    /// server cannot produce an invalid record.
    pub fn from_protocol(value: i64) -> Self {
        match value.saturating_sub(1) {
            i64::MIN..=0 => Self::Error,
            1 => Self::Warning,
            2 => Self::Information,
            _ => Self::Hint,
        }
    }

    /// The 0-based numeric value.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Lower-case name for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

/// One issue reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Local path of the document.
    pub resource: PathBuf,
    pub message: String,
    pub severity: Severity,
    /// 0-based line.
    pub line: u32,
    /// 0-based column.
    pub column: u32,
}

impl Diagnostic {
    /// Format as `path:line:col: severity: message`, with line and column
    /// 1-based and `path` shown relative to `root` when it lies inside it.
    pub fn display(&self, root: Option<&Path>) -> String {
        let path = root
            .and_then(|r| self.resource.strip_prefix(r).ok())
            .unwrap_or(&self.resource);
        format!(
            "{}:{}:{}: {}: {}",
            path.display(),
            self.line + 1,
            self.column + 1,
            self.severity.label(),
            self.message
        )
    }
}

/// `params` of a `textDocument/publishDiagnostics` notification.
///
/// Entries stay raw so one malformed entry does not discard the rest.
#[derive(Debug, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    #[serde(default)]
    pub diagnostics: Vec<serde_json::Value>,
}

/// One protocol diagnostic entry.
#[derive(Debug, Deserialize)]
pub struct WireDiagnostic {
    pub range: WireRange,
    #[serde(default)]
    pub severity: Option<i64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct WireRange {
    pub start: WirePosition,
}

#[derive(Debug, Deserialize)]
pub struct WirePosition {
    pub line: u32,
    pub character: u32,
}
