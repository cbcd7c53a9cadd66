//! Read-only serving of stored photo objects. Only paths that survive the
//! traversal check are touched; everything else is a plain 404.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::safe_object_path;

pub fn router() -> Router<AppState> {
    Router::new().route("/objects/{bucket}/{*key}", get(serve))
}

async fn serve(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> AppResult<Response> {
    let path = safe_object_path(state.config.uploads_path(), &bucket, &key)
        .ok_or(AppError::NotFound)?;

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(AppError::Storage(e.to_string())),
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        data,
    )
        .into_response())
}
