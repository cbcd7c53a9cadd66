use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::{Identity, MaybeAdmin};
use crate::repo::AccessTier;
use crate::state::AppState;
use crate::storage::{parse_object_url, process_batch, UploadedFile};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/photos", get(list).post(create))
        .route(
            "/photos/upload",
            // Leave headroom over the per-file cap so oversized files reach
            // the pipeline and get a per-file diagnostic instead of a 413.
            post(upload).layer(DefaultBodyLimit::max(256 * 1024 * 1024)),
        )
        .route("/photos/{id}", axum::routing::delete(remove))
}

#[derive(Deserialize)]
struct CreatePhoto {
    photo_url: Option<String>,
    accusation_id: Option<String>,
}

async fn list(State(state): State<AppState>, identity: Identity) -> AppResult<Response> {
    let outcome = state.repo.list_photos(AccessTier::Restricted, &identity.0)?;
    Ok(Json(outcome.rows).into_response())
}

/// Register a photo whose binary the client already stored (e.g. an
/// external host). The upload endpoint below is the usual path.
async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreatePhoto>,
) -> AppResult<Response> {
    let photo_url = body
        .photo_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("Missing photo URL".into()))?;

    let row = state
        .repo
        .create_photo(&identity.0, photo_url, body.accusation_id.as_deref())?;
    Ok((StatusCode::CREATED, Json(row)).into_response())
}

/// Multipart batch upload. Files run through the pipeline one at a time;
/// per-file failures are reported individually and never abort the batch.
/// 201 when at least one file landed, 400 when all of them failed.
async fn upload(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut files = Vec::new();
    let mut accusation_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name == "accusation_id" {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid field: {}", e)))?;
            let value = value.trim();
            if !value.is_empty() {
                accusation_id = Some(value.to_string());
            }
        } else {
            let name = field.file_name().unwrap_or("unnamed").to_string();
            let content_type = field.content_type().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid file field: {}", e)))?;
            files.push(UploadedFile {
                name,
                content_type,
                data,
            });
        }
    }

    if files.is_empty() {
        return Err(AppError::Validation("No files provided".into()));
    }

    let total = files.len();
    let outcome = process_batch(
        &state.repo,
        state.store.as_ref(),
        &identity.0,
        accusation_id.as_deref(),
        files,
        |resolved, _| {
            tracing::debug!("Upload progress: {}/{}", resolved, total);
        },
    )
    .await;

    let status = if outcome.any_succeeded() {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome)).into_response())
}

async fn remove(
    State(state): State<AppState>,
    identity: Identity,
    admin: MaybeAdmin,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let photo_url = state.repo.delete_photo(&id, &identity.0, admin.0)?;

    // Best-effort storage cleanup. The row is already gone; an orphaned
    // object is preferable to a ghost listing.
    if let Some((bucket, key)) = parse_object_url(&photo_url) {
        if let Err(e) = state.store.delete(&bucket, &key).await {
            tracing::warn!("Failed to delete storage object {}/{}: {}", bucket, key, e);
        }
    }

    Ok(Json(json!({ "message": "Photo deleted successfully" })).into_response())
}
