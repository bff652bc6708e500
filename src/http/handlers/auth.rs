use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{current_admin, current_org, required_str};
use crate::http::error::ApiError;
use crate::{db, org, AppState};

/// Creates an admin account and eagerly provisions a fresh organization for
/// it. Responds with a session token so the dashboard can connect right away.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let email = required_str(&body, "email")?.to_string();
    let password = required_str(&body, "password")?.to_string();

    // Reject duplicates before provisioning so a failed signup leaves no
    // orphan organization directory.
    {
        let conn = state.db();
        db::ensure_email_free(&conn, &email)?;
    }

    let org_id = org::create_org(state.data_dir())?;
    {
        let conn = state.db();
        db::create_admin(&conn, &email, &password, &org_id)?;
    }
    let token = mint_session(&state, &email);

    tracing::info!(email = %email, org_id = %org_id, "admin signed up");
    Ok(Json(json!({
        "status": "success",
        "org_id": org_id,
        "token": token,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let email = required_str(&body, "email")?.to_string();
    let password = required_str(&body, "password")?.to_string();

    let org_id = {
        let conn = state.db();
        db::verify_admin(&conn, &email, &password)?
    };
    let token = mint_session(&state, &email);

    tracing::info!(email = %email, org_id = %org_id, "admin logged in");
    Ok(Json(json!({
        "status": "success",
        "org_id": org_id,
        "token": token,
    })))
}

/// The organization bound to the requesting admin session.
pub async fn institution_id(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let org_id = current_org(&state, &headers)?;
    Ok(Json(json!({ "org_id": org_id })))
}

/// Regenerates the admin's organization: provisions a new ID and rebinds the
/// account to it. The previous organization's files stay on disk, orphaned.
pub async fn generate_org_id(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let email = current_admin(&state, &headers)?;

    let org_id = org::create_org(state.data_dir())?;
    {
        let conn = state.db();
        db::reassign_org(&conn, &email, &org_id)?;
    }

    tracing::info!(email = %email, org_id = %org_id, "organization regenerated");
    Ok(Json(json!({ "org_id": org_id })))
}

fn mint_session(state: &AppState, email: &str) -> String {
    let token = Uuid::new_v4().to_string();
    state.insert_session(token.clone(), email.to_string());
    token
}
