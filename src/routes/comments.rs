use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::Identity;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list).post(create))
        .route("/comments/{id}", axum::routing::delete(remove))
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "photoId")]
    photo_id: Option<String>,
}

#[derive(Deserialize)]
struct CreateComment {
    photo_id: Option<String>,
    comment: Option<String>,
}

/// Comments are public discussion under a photo: no identity needed to
/// read, only the photo id.
async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> AppResult<Response> {
    let photo_id = query
        .photo_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Missing photoId".into()))?;

    let rows = state.repo.list_comments(photo_id)?;
    Ok(Json(rows).into_response())
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateComment>,
) -> AppResult<Response> {
    let photo_id = body
        .photo_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Missing required fields".into()))?;
    let comment = body
        .comment
        .as_deref()
        .ok_or_else(|| AppError::Validation("Missing required fields".into()))?;

    let row = state.repo.create_comment(&identity.0, photo_id, comment)?;
    Ok((StatusCode::CREATED, Json(row)).into_response())
}

async fn remove(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.repo.delete_comment(&id, &identity.0)?;
    Ok(Json(json!({ "message": "Comment deleted successfully" })).into_response())
}
