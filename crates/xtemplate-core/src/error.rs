//! Error handling for template parsing, rendering and reference queries

use thiserror::Error;

use crate::document::FormatVersion;

/// Main error type for template and reference query operations
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The document declares a format version outside the supported range.
    /// Such a document can still be listed, but never rendered.
    #[error("template format {version} is not supported")]
    MalformedDocument { version: FormatVersion },

    /// XML parsing errors
    #[error("XML error: {message}")]
    Xml { message: String },

    /// Invalid search pattern in a reference query
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted settings payload errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TemplateError {
    /// Create a new XML error
    pub fn xml<S: Into<String>>(message: S) -> Self {
        Self::Xml {
            message: message.into(),
        }
    }

    /// Create a malformed document error for the given format version
    pub fn malformed(version: FormatVersion) -> Self {
        Self::MalformedDocument { version }
    }
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
