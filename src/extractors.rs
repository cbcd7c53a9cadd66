use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::verify_admin_pin;
use crate::error::AppError;
use crate::state::AppState;

/// The caller's anonymous identity. Issued and persisted client-side (the
/// identity provider is external to this server); presented in the
/// x-anon-id header, with an anon_id cookie accepted as fallback.
#[derive(Debug, Clone)]
pub struct Identity(pub String);

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        extract_identity(parts)
            .map(Identity)
            .ok_or(AppError::AuthenticationRequired)
    }
}

/// Proof that the request carried a valid x-admin-pin header. Routes that
/// are admin-only extract this; a bad or missing PIN is 403.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let pin = parts
            .headers
            .get("x-admin-pin")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Forbidden)?;

        if verify_admin_pin(pin, &state.config.admin.pin) {
            Ok(AdminAccess)
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Optional admin flag for routes where admin widens (rather than gates)
/// what the caller may do, e.g. deletes. A wrong PIN simply means
/// not-admin; ownership rules still apply.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAdmin(pub bool);

impl FromRequestParts<AppState> for MaybeAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let is_admin = parts
            .headers
            .get("x-admin-pin")
            .and_then(|v| v.to_str().ok())
            .map(|pin| verify_admin_pin(pin, &state.config.admin.pin))
            .unwrap_or(false);
        Ok(MaybeAdmin(is_admin))
    }
}

fn extract_identity(parts: &Parts) -> Option<String> {
    if let Some(id) = parts
        .headers
        .get("x-anon-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(id.to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == "anon_id" && !val.is_empty() {
                Some(val.to_string())
            } else {
                None
            }
        })
}
