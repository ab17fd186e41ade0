//! Errors raised outside reconciliation passes.
//!
//! Reconciliation itself never fails: per-entry problems become
//! [`PassDiagnostic`](crate::diagnostics::PassDiagnostic)s. What remains is
//! reading the JSON documents a viewer is configured and fed with.

use std::path::{Path, PathBuf};

use crate::color::ColorParseError;

/// The JSON documents the viewer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Config,
    Scene,
    DesiredState,
    ViewerProps,
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Document::Config => write!(f, "viewer config"),
            Document::Scene => write!(f, "scene description"),
            Document::DesiredState => write!(f, "desired state"),
            Document::ViewerProps => write!(f, "viewer props"),
        }
    }
}

#[derive(Debug)]
pub enum ViewerError {
    /// The file behind a document could not be read.
    Read {
        document: Document,
        path: PathBuf,
        source: std::io::Error,
    },
    /// The document is not valid JSON, or does not match its schema.
    Parse {
        document: Document,
        source: serde_json::Error,
    },
    /// A config color field is not `#RRGGBB`.
    BadColor {
        field: &'static str,
        source: ColorParseError,
    },
}

impl std::fmt::Display for ViewerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerError::Read {
                document,
                path,
                source,
            } => write!(f, "failed to read {} {}: {}", document, path.display(), source),
            ViewerError::Parse { document, source } => {
                write!(f, "invalid {}: {}", document, source)
            }
            ViewerError::BadColor { field, source } => {
                write!(f, "bad {} in viewer config: {}", field, source)
            }
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewerError::Read { source, .. } => Some(source),
            ViewerError::Parse { source, .. } => Some(source),
            ViewerError::BadColor { source, .. } => Some(source),
        }
    }
}

impl ViewerError {
    /// Which document the error is about.
    pub fn document(&self) -> Document {
        match self {
            ViewerError::Read { document, .. } | ViewerError::Parse { document, .. } => *document,
            ViewerError::BadColor { .. } => Document::Config,
        }
    }
}

/// Read a document from disk.
pub(crate) fn read_document(document: Document, path: &Path) -> Result<String, ViewerError> {
    std::fs::read_to_string(path).map_err(|source| ViewerError::Read {
        document,
        path: path.to_path_buf(),
        source,
    })
}

/// Deserialize a document.
pub(crate) fn parse_document<T: serde::de::DeserializeOwned>(
    document: Document,
    json: &str,
) -> Result<T, ViewerError> {
    serde_json::from_str(json).map_err(|source| ViewerError::Parse { document, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_read_error_names_document_and_path() {
        let err = read_document(Document::Scene, Path::new("/nonexistent/scene.json")).unwrap_err();
        assert_eq!(err.document(), Document::Scene);
        assert!(err
            .to_string()
            .starts_with("failed to read scene description /nonexistent/scene.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_parse_error() {
        let err = parse_document::<Vec<u32>>(Document::DesiredState, "{").unwrap_err();
        assert_eq!(err.document(), Document::DesiredState);
        assert!(err.to_string().starts_with("invalid desired state"));
    }

    #[test]
    fn test_bad_color_belongs_to_config() {
        let err = ViewerError::BadColor {
            field: "resetColor",
            source: ColorParseError {
                input: "white".to_string(),
            },
        };
        assert_eq!(err.document(), Document::Config);
        assert_eq!(
            err.to_string(),
            "bad resetColor in viewer config: malformed color 'white', expected #RRGGBB"
        );
    }
}
