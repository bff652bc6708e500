use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::required_str;
use crate::http::error::ApiError;
use crate::{org, roster, AppState};

/// Registers an exam taker against an existing organization. Takes `org_id`
/// as an explicit parameter: the registration form runs outside any admin
/// session, with the ID handed out by the admin. The roster read-modify-write
/// is serialized under the same per-org lock as the counters.
pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let org_id = required_str(&body, "org_id")?;
    let exam_id = required_str(&body, "exam_id")?;
    let name = required_str(&body, "name")?;

    org::validate_org_id(org_id)?;
    {
        let lock = state.org_lock(org_id);
        let _guard = lock.lock().await;
        roster::upsert_user(state.data_dir(), org_id, exam_id, name)?;
    }

    tracing::info!(org_id = %org_id, exam_id = %exam_id, "exam taker registered");
    Ok(Json(json!({
        "status": "success",
        "message": format!("{name} registered"),
    })))
}
