pub mod read_document;
pub mod upload_document;

pub use read_document::{
    ReadDocumentOperation, ReadDocumentOperationRequest, ReadDocumentOperationResult,
};
pub use upload_document::{
    UploadDocumentOperation, UploadDocumentOperationRequest, UploadDocumentOperationResult,
};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{DocumentFormatter, FormatError};

    /// Rejects documents starting with `bad` (also when rendering them), fails
    /// to render ones starting with `broken`, and renders everything else
    /// inside `<pre>`.
    pub(crate) struct StubFormatter;

    impl DocumentFormatter for StubFormatter {
        fn validate(&self, label: &str, data: &[u8]) -> Result<(), FormatError> {
            if data.starts_with(b"bad") {
                return Err(FormatError::Syntax {
                    label: label.to_string(),
                    line: 1,
                    message: "bad document".to_string(),
                });
            }
            Ok(())
        }

        fn render(&self, label: &str, data: &[u8]) -> Result<String, FormatError> {
            self.validate(label, data)?;
            if data.starts_with(b"broken") {
                return Err(FormatError::Render {
                    label: label.to_string(),
                    message: "cannot render".to_string(),
                });
            }
            let text = std::str::from_utf8(data).map_err(|_| FormatError::Encoding {
                label: label.to_string(),
            })?;
            Ok(format!("<pre>{}</pre>", text))
        }
    }
}
