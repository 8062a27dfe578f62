use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: String,
    pub(crate) blobs: usize,
    pub(crate) usage_bytes: u64,
    pub(crate) quota_bytes: u64,
}
