//! Translation between local paths and `file://` URIs.
use std::path::{Path, PathBuf};

use crate::error::LspError;

const FILE_SCHEME: &str = "file://";

/// Maps local paths to protocol URIs and back.
pub trait UriMapper {
    /// `path` made absolute against the project root.
    fn resolve(&self, path: &Path) -> PathBuf;

    /// Absolute `file://` URI for `path`, resolved as by
    /// [`resolve`](Self::resolve).
    fn path_to_uri(&self, path: &Path) -> Result<String, LspError>;

    /// Local path for a URI received from the server.
    fn uri_to_path(&self, uri: &str) -> PathBuf;
}

/// [`UriMapper`] for a project rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileUriMapper {
    root: PathBuf,
}

impl FileUriMapper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl UriMapper for FileUriMapper {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn path_to_uri(&self, path: &Path) -> Result<String, LspError> {
        let absolute = self.resolve(path);
        url::Url::from_file_path(&absolute)
            .map(String::from)
            .map_err(|()| LspError::Uri(absolute))
    }

    fn uri_to_path(&self, uri: &str) -> PathBuf {
        url::Url::parse(uri)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .unwrap_or_else(|| PathBuf::from(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn mapper() -> FileUriMapper {
        FileUriMapper::new("/proj")
    }

    #[test]
    fn absolute_path_to_uri() {
        assert_eq!(
            mapper().path_to_uri(Path::new("/proj/a.gd")).unwrap(),
            "file:///proj/a.gd"
        );
    }

    #[test]
    fn relative_path_resolves_against_root() {
        assert_eq!(
            mapper().path_to_uri(Path::new("scenes/main.gd")).unwrap(),
            "file:///proj/scenes/main.gd"
        );
    }

    #[test]
    fn uri_to_path_strips_scheme() {
        assert_eq!(
            mapper().uri_to_path("file:///proj/a.gd"),
            PathBuf::from("/proj/a.gd")
        );
    }

    #[test]
    fn uri_round_trip_with_spaces() {
        let m = mapper();
        let uri = m.path_to_uri(Path::new("/proj/my scene.gd")).unwrap();
        assert_eq!(uri, "file:///proj/my%20scene.gd");
        assert_eq!(m.uri_to_path(&uri), PathBuf::from("/proj/my scene.gd"));
    }

    #[test]
    fn non_file_uri_falls_back_to_raw_text() {
        assert_eq!(
            mapper().uri_to_path("res://player.gd"),
            PathBuf::from("res://player.gd")
        );
    }
}
