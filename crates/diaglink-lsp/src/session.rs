//! Batch checking: connect, handshake, request diagnostics for a set of
//! files and collect what the server publishes for them.
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::client::{ClientEvent, DiagnosticsClient, TickOutcome};
use crate::error::LspError;
use crate::socket::{StreamStatus, Transport};
use crate::types::{Diagnostic, Severity};

/// Diagnostics received for one requested file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// `None` when nothing was published before the deadline.
    pub diagnostics: Option<Vec<Diagnostic>>,
}

/// Result of [`check_files`], in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub files: Vec<FileReport>,
}

impl Report {
    /// Number of received diagnostics with `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics().filter(|d| d.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Whether every file got a publication.
    pub fn is_complete(&self) -> bool {
        self.files.iter().all(|f| f.diagnostics.is_some())
    }

    /// Files with no publication.
    pub fn missing(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|f| f.diagnostics.is_none())
            .map(|f| f.path.as_path())
    }

    /// Every received diagnostic, file by file.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files
            .iter()
            .filter_map(|f| f.diagnostics.as_deref())
            .flatten()
    }

    /// Record a publication for the first still-waiting file at `path`.
    /// Later publications for the same file are ignored.
    fn record(&mut self, path: &Path, diagnostics: Vec<Diagnostic>) -> bool {
        match self
            .files
            .iter_mut()
            .find(|f| f.path == path && f.diagnostics.is_none())
        {
            Some(file) => {
                file.diagnostics = Some(diagnostics);
                true
            }
            None => false,
        }
    }
}

/// Check `files` and wait until each has a publication or `timeout`
/// elapses, whichever comes first.
///
/// Connects and performs the handshake first unless the client is already
/// initialized on a live connection. Files still waiting at the deadline
/// come back with `diagnostics: None`.
///
/// # Errors
///
/// Fails when the connection cannot be established or initialized in time,
/// when a file cannot be read, or when the connection drops while waiting.
pub async fn check_files<T: Transport>(
    client: &mut DiagnosticsClient<T>,
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
    files: &[PathBuf],
    timeout: Duration,
) -> Result<Report, LspError> {
    let deadline = Instant::now() + timeout;

    if !client.is_initialized() || client.status() != StreamStatus::Connected {
        handshake(client, deadline, timeout).await?;
    }

    let _lease = client.processing_lease();
    let mut report = Report::default();
    for path in files {
        client.request_diagnostics(path)?;
        report.files.push(FileReport {
            path: client.resolve_path(path),
            diagnostics: None,
        });
    }

    loop {
        collect(client, events, &mut report);
        if report.is_complete() {
            break;
        }
        match time::timeout_at(deadline, client.next_tick()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(_) => {
                tracing::warn!("timed out waiting for diagnostics");
                break;
            }
        }
        if client.tick() == TickOutcome::Stopped {
            return Err(LspError::ConnectionLost(
                "connection closed while waiting for diagnostics".into(),
            ));
        }
    }

    Ok(report)
}

/// Connect and tick until the `initialize` round trip is done.
///
/// The hold `connect` adds is released on every failure path; on success
/// the client releases it itself. Other holds the caller has do not matter.
async fn handshake<T: Transport>(
    client: &mut DiagnosticsClient<T>,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), LspError> {
    if let Err(e) = client.connect() {
        client.disconnect();
        client.disable_processing();
        return Err(e);
    }

    let waited = time::timeout_at(deadline, async {
        while !client.is_initialized() {
            if !client.next_tick().await {
                return Err(LspError::ConnectionLost(
                    "polling stopped before the handshake finished".into(),
                ));
            }
            if client.tick() == TickOutcome::Stopped {
                return Err(LspError::ConnectionLost(
                    "connection closed during the handshake".into(),
                ));
            }
        }
        Ok(())
    })
    .await;

    let result = match waited {
        Ok(result) => result,
        Err(_) => {
            client.disconnect();
            Err(LspError::Timeout(timeout))
        }
    };
    if result.is_err() {
        client.disable_processing();
    }
    result
}

fn collect<T: Transport>(
    client: &DiagnosticsClient<T>,
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
    report: &mut Report,
) {
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::DiagnosticsPublished { uri, diagnostics } = event {
            let path = client.uri_to_path(&uri);
            if !report.record(&path, diagnostics) {
                tracing::debug!("ignoring publication for {}", uri);
            }
        }
    }
}
