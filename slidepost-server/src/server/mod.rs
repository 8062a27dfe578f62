use crate::config::Config;
use crate::present::PresentFormatter;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use slidepost_core::{
    ContentStore, DocumentFormatter, ExpirySweeper, ReadDocumentOperation, Result,
    ServiceOptions, SlideError, UploadDocumentOperation,
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;

mod external;
mod pages;
mod types;

use external::{health, index, upload, view_slide};
pub(crate) use types::*;

// room for multipart framing around the file field
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct ServerState {
    pub(crate) options: Arc<ServiceOptions>,
    pub(crate) store: Arc<ContentStore>,
    pub(crate) upload_document_operation: Arc<UploadDocumentOperation>,
    pub(crate) read_document_operation: Arc<ReadDocumentOperation>,
}

pub fn build_state(
    options: Arc<ServiceOptions>,
    formatter: Arc<dyn DocumentFormatter>,
) -> Result<Arc<ServerState>> {
    let store = Arc::new(ContentStore::new(
        &options.storage_root,
        options.quota_accounting,
    )?);

    let upload_document_operation = Arc::new(UploadDocumentOperation::new(
        store.clone(),
        formatter.clone(),
        options.clone(),
    ));
    let read_document_operation = Arc::new(ReadDocumentOperation::new(store.clone(), formatter));

    Ok(Arc::new(ServerState {
        options,
        store,
        upload_document_operation,
        read_document_operation,
    }))
}

pub fn build_router(state: Arc<ServerState>, web_root: Option<&Path>) -> Router {
    let body_limit = usize::try_from(state.options.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let mut router = Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/slide/:key", get(view_slide))
        .route("/health", get(health));

    if let Some(web_root) = web_root {
        router = router.nest_service("/static", ServeDir::new(web_root.join("static")));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve until `token` is cancelled, then stop the sweeper and return.
pub async fn run_server(config: Config, token: CancellationToken) -> Result<()> {
    let options = Arc::new(config.to_service_options()?);

    let mut formatter = PresentFormatter::new();
    if config.web_root.is_some() {
        formatter = formatter.with_stylesheet("/static/slides.css");
    }
    let state = build_state(options.clone(), Arc::new(formatter))?;
    tracing::info!("Running with storage: {}", options.storage_root.display());

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Slidepost listening on {}", config.bind_addr);

    // nothing below returns early, so the sweeper is always shut down
    let sweeper = ExpirySweeper::from_options(state.store.clone(), &options)
        .spawn(token.child_token());

    let app = build_router(state, config.web_root.as_deref());

    let shutdown = token.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|error| SlideError::Http(error.to_string()));

    let status = sweeper.shutdown().await;
    tracing::info!(
        "Expiry sweeper stopped after {} sweeps",
        status.completed_sweeps
    );

    served
}

pub(crate) fn response_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

pub(crate) fn error_status(error: &SlideError) -> StatusCode {
    match error {
        SlideError::NotFound(_) => StatusCode::NOT_FOUND,
        SlideError::SizeExceeded { .. }
        | SlideError::QuotaExceeded { .. }
        | SlideError::Validation(_) => StatusCode::BAD_REQUEST,
        SlideError::Render(_) | SlideError::Io(_) | SlideError::Config(_) | SlideError::Http(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn slide_error_response(error: SlideError) -> Response {
    let status = error_status(&error);
    match error {
        SlideError::NotFound(_) => response_error(status, "not found"),
        SlideError::Io(error) => {
            tracing::error!("Storage error: {}", error);
            response_error(status, "internal storage error")
        }
        error => response_error(status, error.to_string()),
    }
}
