use crate::{ContentStore, DocumentFormatter, FormatError, Result, SlideError, sanitize_key};
use std::sync::Arc;

#[derive(Clone)]
pub struct ReadDocumentOperation {
    store: Arc<ContentStore>,
    formatter: Arc<dyn DocumentFormatter>,
}

#[derive(Debug, Clone)]
pub struct ReadDocumentOperationRequest {
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct ReadDocumentOperationResult {
    pub key: String,
    pub html: String,
    pub size_bytes: u64,
}

impl ReadDocumentOperation {
    pub fn new(store: Arc<ContentStore>, formatter: Arc<dyn DocumentFormatter>) -> Self {
        Self { store, formatter }
    }

    pub async fn run(
        &self,
        request: ReadDocumentOperationRequest,
    ) -> Result<ReadDocumentOperationResult> {
        let key = sanitize_key(&request.key)
            .ok_or_else(|| SlideError::NotFound(request.key.clone()))?
            .to_string();

        // a sweep may delete the blob between lookup and read; that is an
        // ordinary not-found
        let data = self.store.get(&key).await?;

        let html = self.formatter.render(&key, &data).map_err(|error| {
            tracing::warn!("error rendering slide {}: {}", key, error);
            SlideError::Render(render_failure_message(&error))
        })?;

        Ok(ReadDocumentOperationResult {
            key,
            html,
            size_bytes: data.len() as u64,
        })
    }
}

/// Stored bytes that no longer parse are reported apart from render failures.
fn render_failure_message(error: &FormatError) -> String {
    match error {
        FormatError::Encoding { .. } | FormatError::Syntax { .. } => {
            format!("parse error: {}", error)
        }
        FormatError::Render { .. } => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::StubFormatter;
    use crate::{QuotaAccounting, compute_key};
    use bytes::Bytes;

    async fn setup(
        root: &std::path::Path,
        documents: &[&'static [u8]],
    ) -> (ReadDocumentOperation, Vec<String>) {
        let store = Arc::new(ContentStore::new(root, QuotaAccounting::Aggregate).unwrap());
        let mut keys = Vec::new();
        for document in documents {
            let key = compute_key(document);
            store
                .put(&key, Bytes::from_static(document), 1_000, 1_000_000)
                .await
                .unwrap();
            keys.push(key);
        }
        (ReadDocumentOperation::new(store, Arc::new(StubFormatter)), keys)
    }

    #[tokio::test]
    async fn renders_stored_document() {
        let dir = tempfile::tempdir().unwrap();
        let (operation, keys) = setup(dir.path(), &[b"hello slides"]).await;

        let result = operation
            .run(ReadDocumentOperationRequest {
                key: keys[0].clone(),
            })
            .await
            .unwrap();
        assert_eq!(result.key, keys[0]);
        assert_eq!(result.html, "<pre>hello slides</pre>");
        assert_eq!(result.size_bytes, 12);
    }

    #[tokio::test]
    async fn missing_and_traversal_keys_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (operation, _) = setup(dir.path(), &[]).await;
        std::fs::write(dir.path().join("outside"), b"secret").unwrap();

        for key in ["", "../outside", "0123456789abcdef0123456789abcdef"] {
            let error = operation
                .run(ReadDocumentOperationRequest {
                    key: key.to_string(),
                })
                .await;
            assert!(matches!(error, Err(SlideError::NotFound(_))), "key {:?}", key);
        }
    }

    #[tokio::test]
    async fn render_failure_is_distinct_from_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (operation, keys) = setup(dir.path(), &[b"broken slides"]).await;

        let error = operation
            .run(ReadDocumentOperationRequest {
                key: keys[0].clone(),
            })
            .await;
        assert!(matches!(error, Err(SlideError::Render(message)) if message.contains("cannot render")));
    }

    #[tokio::test]
    async fn parse_failure_is_reported_as_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let (operation, keys) = setup(dir.path(), &[b"bad slides", b"broken slides"]).await;

        let error = operation
            .run(ReadDocumentOperationRequest {
                key: keys[0].clone(),
            })
            .await;
        match error {
            Err(SlideError::Render(message)) => {
                assert!(message.starts_with("parse error: "), "{}", message);
                assert!(message.contains("bad document"));
            }
            other => panic!("unexpected result: {:?}", other.map(|result| result.key)),
        }

        let error = operation
            .run(ReadDocumentOperationRequest {
                key: keys[1].clone(),
            })
            .await;
        assert!(matches!(error, Err(SlideError::Render(message)) if !message.starts_with("parse error")));
    }
}
