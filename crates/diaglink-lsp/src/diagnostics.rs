//! Decoding of `textDocument/publishDiagnostics` pushes.
//!
//! Each publication is the complete, authoritative set for one document at
//! that moment; nothing is cached between publications.
use crate::error::LspError;
use crate::types::{Diagnostic, PublishDiagnosticsParams, Severity, WireDiagnostic};
use crate::uri::UriMapper;

/// Severity used when an entry carries none.
const DEFAULT_SEVERITY: Severity = Severity::Warning;

/// One decoded publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// The URI exactly as the server sent it.
    pub uri: String,
    /// Decoded entries, in server order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Decode the `params` of a publication.
///
/// An empty diagnostics list returns immediately without consulting
/// `mapper`. Otherwise the URI is mapped once and shared by every record.
/// Entries that do not have the expected shape are skipped with a warning.
pub fn decode_publication(
    params: serde_json::Value,
    mapper: &dyn UriMapper,
) -> Result<Publication, LspError> {
    let params: PublishDiagnosticsParams = serde_json::from_value(params)
        .map_err(|e| LspError::InvalidPayload(format!("publishDiagnostics params: {e}")))?;

    if params.diagnostics.is_empty() {
        return Ok(Publication {
            uri: params.uri,
            diagnostics: Vec::new(),
        });
    }

    let resource = mapper.uri_to_path(&params.uri);
    let diagnostics = params
        .diagnostics
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<WireDiagnostic>(entry) {
            Ok(wire) => Some(Diagnostic {
                resource: resource.clone(),
                message: wire.message,
                severity: wire
                    .severity
                    .map_or(DEFAULT_SEVERITY, Severity::from_protocol),
                line: wire.range.start.line,
                column: wire.range.start.character,
            }),
            Err(e) => {
                tracing::warn!(uri = %params.uri, "skipping malformed diagnostic: {}", e);
                None
            }
        })
        .collect();

    Ok(Publication {
        uri: params.uri,
        diagnostics,
    })
}
