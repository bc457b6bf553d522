use std::io::ErrorKind;

use axum::{
    Json,
    extract::{Path as AxumPath, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{
    storage::content_type_for,
    web::{ApiMessage, AppState, json_error},
};

/// Serves an object from the local bucket. Only routed when the local backend is active.
pub async fn serve_stored_object(
    State(state): State<AppState>,
    AxumPath(object_path): AxumPath<String>,
) -> Result<Response, (StatusCode, Json<ApiMessage>)> {
    let bucket = state
        .storage()
        .local()
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Not found."))?;
    let path = bucket
        .resolve(&object_path)
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Not found."))?;

    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            json_error(StatusCode::NOT_FOUND, "Not found.")
        } else {
            error!(?err, file = %path.display(), "failed to read stored object");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "File could not be read.")
        }
    })?;

    let mut headers = HeaderMap::new();
    let content_type = content_type_for(&path);
    if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );

    Ok((headers, bytes).into_response())
}
