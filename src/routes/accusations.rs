use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::{Identity, MaybeAdmin};
use crate::repo::AccessTier;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accusations", get(list).post(create))
        .route("/accusations/{id}", axum::routing::delete(remove))
}

#[derive(Deserialize)]
struct CreateAccusation {
    accused_name: Option<String>,
    reason: Option<String>,
    /// Raw-text convenience mode: one free-text field split into name and
    /// reason server-side. Ignored when the structured fields are present.
    text: Option<String>,
}

async fn list(State(state): State<AppState>, identity: Identity) -> AppResult<Response> {
    let outcome = state
        .repo
        .list_accusations(AccessTier::Restricted, &identity.0)?;
    Ok(Json(outcome.rows).into_response())
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateAccusation>,
) -> AppResult<Response> {
    let (accused_name, reason) = match (body.accused_name, body.reason) {
        (Some(name), Some(reason)) => (name, reason),
        _ => match body.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => parse_submission(text),
            None => {
                return Err(AppError::Validation("Missing required fields".into()));
            }
        },
    };

    let row = state
        .repo
        .create_accusation(&identity.0, &accused_name, &reason)?;
    Ok((StatusCode::CREATED, Json(row)).into_response())
}

async fn remove(
    State(state): State<AppState>,
    identity: Identity,
    admin: MaybeAdmin,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.repo.delete_accusation(&id, &identity.0, admin.0)?;
    Ok(Json(json!({ "message": "Accusation deleted successfully" })).into_response())
}

/// Best-effort split of a free-text submission into (accused_name, reason).
///
/// Submissions usually read "Acuso a [nombre] por [motivo]". When " por "
/// is present we take everything before it as the name (minus a leading
/// "acuso a") and everything after as the reason. Otherwise the first line
/// (capped at 50 chars) stands in as the name, the whole text as the
/// reason, and a placeholder covers an empty name.
fn parse_submission(text: &str) -> (String, String) {
    if let Some((before, after)) = text.split_once(" por ") {
        let name = strip_acuso_prefix(before).trim();
        let reason = after.trim();
        if !name.is_empty() && !reason.is_empty() {
            return (name.to_string(), reason.to_string());
        }
    }

    let first_line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let name: String = first_line.chars().take(50).collect();
    let name = if name.is_empty() {
        "Anónimo".to_string()
    } else {
        name
    };
    (name, text.to_string())
}

fn strip_acuso_prefix(s: &str) -> &str {
    let trimmed = s.trim_start();
    match trimmed.get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case("acuso a ") => &trimmed[8..],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_format() {
        let (name, reason) = parse_submission("Acuso a Carlos por llegar tarde");
        assert_eq!(name, "Carlos");
        assert_eq!(reason, "llegar tarde");
    }

    #[test]
    fn prefix_strip_is_case_insensitive() {
        let (name, _) = parse_submission("acuso a María por dormirse");
        assert_eq!(name, "María");
    }

    #[test]
    fn multiple_por_keeps_rest_in_reason() {
        let (name, reason) = parse_submission("Acuso a Ana por pasar por la puerta");
        assert_eq!(name, "Ana");
        assert_eq!(reason, "pasar por la puerta");
    }

    #[test]
    fn no_separator_falls_back_to_first_line() {
        let (name, reason) = parse_submission("Carlos hizo algo\ny no me gustó");
        assert_eq!(name, "Carlos hizo algo");
        assert_eq!(reason, "Carlos hizo algo\ny no me gustó");
    }

    #[test]
    fn fallback_name_capped_at_50_chars() {
        let long = "x".repeat(80);
        let (name, reason) = parse_submission(&long);
        assert_eq!(name.chars().count(), 50);
        assert_eq!(reason, long);
    }

    #[test]
    fn name_without_reason_falls_back() {
        // " por " present but nothing after it: fall through to the
        // whole-text fallback instead of creating a blank reason.
        let (name, reason) = parse_submission("Acuso a Carlos por  ");
        assert_eq!(name, "Acuso a Carlos por");
        assert_eq!(reason, "Acuso a Carlos por  ");
    }
}
