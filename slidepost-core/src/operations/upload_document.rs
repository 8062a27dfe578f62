use crate::{
    ContentStore, DocumentFormatter, Result, ServiceOptions, SlideError, compute_key,
};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct UploadDocumentOperation {
    store: Arc<ContentStore>,
    formatter: Arc<dyn DocumentFormatter>,
    options: Arc<ServiceOptions>,
}

#[derive(Debug, Clone)]
pub struct UploadDocumentOperationRequest {
    pub body: Bytes,
    /// Size announced by the client, when the transport carries one.
    pub declared_size: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct UploadDocumentOperationResult {
    pub key: String,
    pub url: String,
    pub ttl_hours: u64,
    pub size_bytes: u64,
    pub replaced: bool,
}

impl UploadDocumentOperation {
    pub fn new(
        store: Arc<ContentStore>,
        formatter: Arc<dyn DocumentFormatter>,
        options: Arc<ServiceOptions>,
    ) -> Self {
        Self {
            store,
            formatter,
            options,
        }
    }

    pub async fn run(
        &self,
        request: UploadDocumentOperationRequest,
    ) -> Result<UploadDocumentOperationResult> {
        let UploadDocumentOperationRequest {
            body,
            declared_size,
        } = request;

        let max_file_size = self.options.max_file_size;
        let size = declared_size.unwrap_or(0).max(body.len() as u64);
        if size > max_file_size {
            return Err(SlideError::SizeExceeded {
                max: max_file_size,
                actual: size,
            });
        }

        let key = compute_key(&body);
        self.formatter
            .validate(&key, &body)
            .map_err(|error| SlideError::Validation(error.to_string()))?;

        let put = self
            .store
            .put(&key, body, max_file_size, self.options.max_quota)
            .await?;

        tracing::info!(
            "Uploaded slide {} ({} bytes, replaced={})",
            key,
            put.size_bytes,
            put.replaced
        );

        Ok(UploadDocumentOperationResult {
            url: self.options.slide_url(&key),
            key,
            ttl_hours: self.options.max_hours,
            size_bytes: put.size_bytes,
            replaced: put.replaced,
        })
    }
}
