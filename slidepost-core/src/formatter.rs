//! The seam between storage and the slide document format.
//!
//! Storage never looks inside a blob; validating uploads and turning stored
//! bytes into HTML is delegated to a [`DocumentFormatter`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("{label}: document is not valid UTF-8")]
    Encoding { label: String },

    #[error("{label}:{line}: {message}")]
    Syntax {
        label: String,
        line: usize,
        message: String,
    },

    #[error("{label}: {message}")]
    Render { label: String, message: String },
}

/// Validates and renders raw document bytes.
///
/// `label` identifies the document in error messages; callers pass the
/// content key.
pub trait DocumentFormatter: Send + Sync {
    fn validate(&self, label: &str, data: &[u8]) -> Result<(), FormatError>;

    fn render(&self, label: &str, data: &[u8]) -> Result<String, FormatError>;
}
