pub mod auth;
pub mod roster;
pub mod violations;
pub mod ws;

use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use super::error::ApiError;
use crate::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Pulls a required, non-empty string field out of a JSON body. Missing,
/// non-string, and blank all map to the same 400.
pub(crate) fn required_str<'a>(body: &'a Value, key: &str) -> Result<&'a str, ApiError> {
    match body.get(key).and_then(|v| v.as_str()).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ApiError::Validation(format!("missing {key}"))),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the admin email behind the request's session token.
pub(crate) fn current_admin(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| ApiError::Auth("missing session".into()))?;
    state
        .session_email(token)
        .ok_or_else(|| ApiError::Auth("unknown session".into()))
}

/// The `currentOrganization` contract: every admin-surface operation resolves
/// its organization through the session, never from an ambient default. Goes
/// through the credentials table so a regenerated ID is visible immediately.
pub(crate) fn current_org(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let email = current_admin(state, headers)?;
    let conn = state.db();
    Ok(crate::db::admin_org(&conn, &email)?)
}
