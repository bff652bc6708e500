use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use super::{current_org, required_str};
use crate::http::error::ApiError;
use crate::rooms::ViolationUpdate;
use crate::{counter, org, AppState};

/// Ingests one violation event from a client agent. Serialized per
/// organization around the counters read-modify-write; the room publish
/// happens after the lock is dropped and the snapshot is durable, so
/// subscribers never see an event the pull path cannot confirm yet.
pub async fn report_violation(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let org_id = required_str(&body, "org_id")?.to_string();
    let user_id = required_str(&body, "user_id")?.to_string();
    let violation_type = required_str(&body, "type")?.to_string();

    // Validate before touching the lock map: org_id is untrusted and lock
    // entries are keyed by it for the process lifetime.
    org::validate_org_id(&org_id)?;

    let recorded = {
        let lock = state.org_lock(&org_id);
        let _guard = lock.lock().await;
        counter::record_violation(state.data_dir(), &org_id, &user_id, &violation_type)?
    };

    tracing::info!(
        org_id = %org_id,
        user_id = %user_id,
        violation_type = %violation_type,
        count = recorded.count,
        "violation recorded"
    );

    state.rooms().publish(
        &org_id,
        ViolationUpdate {
            user_id,
            violation_type,
            name: recorded.name,
            count: recorded.count,
            recorded_at: Utc::now(),
        },
    );

    Ok(Json(json!({
        "status": "success",
        "count": recorded.count,
    })))
}

/// Full counters snapshot for the dashboard's initial load. `{}` when the
/// organization has nothing recorded.
pub async fn violation_summary(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<counter::Summary>, ApiError> {
    let summary = counter::get_summary(state.data_dir(), &org_id)?;
    Ok(Json(summary))
}

/// Explicit, session-scoped reset. Deliberately not a side effect of any
/// read: an admin may only clear the organization their session is bound to.
pub async fn reset_summary(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let session_org = current_org(&state, &headers)?;
    if session_org != org_id {
        return Err(ApiError::Forbidden(
            "session is not bound to this organization".into(),
        ));
    }
    org::validate_org_id(&org_id)?;

    {
        let lock = state.org_lock(&org_id);
        let _guard = lock.lock().await;
        counter::reset_summary(state.data_dir(), &org_id)?;
    }

    tracing::info!(org_id = %org_id, "counters reset");
    Ok(Json(json!({ "status": "success" })))
}
