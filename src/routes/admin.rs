//! Admin dashboard surface. Every route here re-validates the raw PIN via
//! the AdminAccess extractor; the session endpoints only manage the
//! convenience cache that keeps the dashboard from re-prompting.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AdminSession;
use crate::error::{AppError, AppResult};
use crate::extractors::AdminAccess;
use crate::repo::AccessTier;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/photos", get(all_photos))
        .route("/admin/settings", get(get_settings).put(put_settings))
        .route(
            "/admin/session",
            post(open_session)
                .get(check_session)
                .delete(close_session),
        )
}

/// All photos regardless of owner, through the privileged tier. The
/// response is tagged with the mode actually served so a dashboard can
/// tell an empty board from a degraded listing.
async fn all_photos(
    State(state): State<AppState>,
    _admin: AdminAccess,
) -> AppResult<Response> {
    let outcome = state.repo.list_photos(AccessTier::Privileged, "")?;
    Ok(Json(outcome).into_response())
}

/// Never hard-fails: any backend fault degrades to the defaults so the
/// notifications toggle can't take the dashboard down.
async fn get_settings(State(state): State<AppState>, _admin: AdminAccess) -> Response {
    Json(state.repo.get_settings()).into_response()
}

#[derive(Deserialize)]
struct SettingsUpdate {
    notifications_enabled: serde_json::Value,
}

async fn put_settings(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Json(body): Json<SettingsUpdate>,
) -> AppResult<Response> {
    // Strictly boolean; truthy strings or numbers are rejected.
    let enabled = body
        .notifications_enabled
        .as_bool()
        .ok_or_else(|| AppError::Validation("Invalid notifications_enabled value".into()))?;

    let row = state.repo.put_settings(enabled)?;
    Ok(Json(row).into_response())
}

#[derive(Deserialize)]
struct SessionRequest {
    pin: String,
}

async fn open_session(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> AppResult<Response> {
    let mut sessions = state.admin_sessions.lock().await;
    match sessions.set(&body.pin, &state.config.admin.pin, chrono::Utc::now()) {
        Some(token) => Ok(Json(AdminSession {
            is_admin: true,
            token: Some(token),
        })
        .into_response()),
        None => Ok((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Invalid PIN", "is_admin": false })),
        )
            .into_response()),
    }
}

async fn check_session(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> AppResult<Response> {
    let token = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let mut sessions = state.admin_sessions.lock().await;
    let session = sessions.get(token, chrono::Utc::now());
    Ok(Json(session).into_response())
}

async fn close_session(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> AppResult<Response> {
    if let Some(token) = headers.get("x-admin-token").and_then(|v| v.to_str().ok()) {
        state.admin_sessions.lock().await.clear(token);
    }
    Ok(Json(json!({ "message": "Session cleared" })).into_response())
}
