//! Source of document text sent with `textDocument/didOpen`.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::LspError;

/// Reads the full text of a document.
pub trait DocumentSource {
    fn read_text(&self, path: &Path) -> Result<String, LspError>;
}

/// Reads documents from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDocuments;

impl DocumentSource for FsDocuments {
    fn read_text(&self, path: &Path) -> Result<String, LspError> {
        std::fs::read_to_string(path).map_err(|e| LspError::Document {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// In-memory documents, keyed by path.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocuments {
    texts: HashMap<PathBuf, String>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.texts.insert(path.into(), text.into());
    }
}

impl DocumentSource for InMemoryDocuments {
    fn read_text(&self, path: &Path) -> Result<String, LspError> {
        self.texts
            .get(path)
            .cloned()
            .ok_or_else(|| LspError::Document {
                path: path.to_path_buf(),
                reason: "not found".to_string(),
            })
    }
}
