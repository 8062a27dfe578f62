use super::{HealthResponse, ServerState, pages, response_error, slide_error_response};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State, multipart::Field},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use bytes::BytesMut;
use slidepost_core::{ReadDocumentOperationRequest, SlideError, UploadDocumentOperationRequest};
use std::sync::Arc;

const UPLOAD_FIELD: &str = "filename";

pub(crate) async fn index(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Html(pages::index_page(
        state.options.max_file_size,
        state.options.max_hours,
    ))
}

pub(crate) async fn health(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let entries = match state.store.list().await {
        Ok(entries) => entries,
        Err(error) => return slide_error_response(error),
    };
    // the figure quota checks are made against
    let usage_bytes = match state.store.usage().await {
        Ok(usage_bytes) => usage_bytes,
        Err(error) => return slide_error_response(error),
    };

    let payload = HealthResponse {
        status: "ok".to_string(),
        blobs: entries.len(),
        usage_bytes,
        quota_bytes: state.options.max_quota,
    };

    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn upload(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let max_file_size = state.options.max_file_size;

    let body = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return response_error(StatusCode::BAD_REQUEST, "nothing received"),
            Err(error) => return response_error(error.status(), error.body_text()),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        match read_field(field, max_file_size).await {
            Ok(body) => break body,
            Err(response) => return response,
        }
    };

    let operation_result = state
        .upload_document_operation
        .run(UploadDocumentOperationRequest {
            body,
            declared_size: None,
        })
        .await;

    match operation_result {
        Ok(result) => (StatusCode::OK, Html(pages::upload_page(&result))).into_response(),
        Err(error) => {
            tracing::debug!("Upload rejected: {}", error);
            slide_error_response(error)
        }
    }
}

pub(crate) async fn view_slide(
    State(state): State<Arc<ServerState>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    match state
        .read_document_operation
        .run(ReadDocumentOperationRequest { key })
        .await
    {
        Ok(result) => (StatusCode::OK, Html(result.html)).into_response(),
        Err(error) => slide_error_response(error),
    }
}

/// Read an upload field, buffering at most `max_file_size` bytes.
///
/// An oversized field is still drained so the client receives the error
/// response instead of a reset connection.
async fn read_field(mut field: Field<'_>, max_file_size: u64) -> Result<Bytes, Response> {
    let mut buffer = BytesMut::new();
    let mut size: u64 = 0;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(error) => return Err(response_error(error.status(), error.body_text())),
        };

        size += chunk.len() as u64;
        if size <= max_file_size {
            buffer.extend_from_slice(&chunk);
        }
    }

    if size > max_file_size {
        return Err(slide_error_response(SlideError::SizeExceeded {
            max: max_file_size,
            actual: size,
        }));
    }

    Ok(buffer.freeze())
}
