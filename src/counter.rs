use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::StoreError;
use crate::{org, roster};

/// Per-user violation counters. `counts` is an open label set keyed by the
/// violation type string (e.g. `face_outside_webcam_frame`,
/// `eye_outside_frame`); flattened so each label sits next to `name` in the
/// serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCounters {
    pub name: String,
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
}

/// The full counters snapshot for one organization, keyed by user ID.
pub type Summary = BTreeMap<String, UserCounters>;

fn load(data_dir: &Path, org_id: &str) -> anyhow::Result<Summary> {
    let path = org::counters_path(data_dir, org_id);
    if !path.is_file() {
        return Ok(Summary::new());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read counters {}", path.to_string_lossy()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("counters {} is invalid JSON", path.to_string_lossy()))
}

/// Outcome of recording one violation: the resolved display name and the new
/// count for that `(user, violation_type)` pair.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub name: String,
    pub count: u64,
}

/// Increments the counter for `(user_id, violation_type)` and persists the
/// updated snapshot before returning. The organization is provisioned lazily:
/// client agents report against an ID handed to them out of band, so a fresh
/// ID simply starts a fresh counters file.
///
/// Callers that can race on the same organization must serialize around this
/// read-modify-write (the HTTP layer holds a per-org lock).
pub fn record_violation(
    data_dir: &Path,
    org_id: &str,
    user_id: &str,
    violation_type: &str,
) -> Result<Recorded, StoreError> {
    let user_id = user_id.trim();
    let violation_type = violation_type.trim();
    if user_id.is_empty() {
        return Err(StoreError::invalid("missing user_id"));
    }
    if violation_type.is_empty() {
        return Err(StoreError::invalid("missing type"));
    }
    // "name" is reserved for the display-name field in the snapshot.
    if violation_type == "name" {
        return Err(StoreError::invalid("invalid violation type"));
    }
    org::validate_org_id(org_id)?;
    org::provision(data_dir, org_id)?;

    let mut summary = load(data_dir, org_id)?;
    let entry = summary
        .entry(user_id.to_string())
        .or_insert_with(|| UserCounters {
            name: roster::lookup_name(data_dir, org_id, user_id),
            counts: BTreeMap::new(),
        });
    let count = entry.counts.entry(violation_type.to_string()).or_insert(0);
    *count += 1;
    let recorded = Recorded {
        name: entry.name.clone(),
        count: *count,
    };

    org::write_json_atomic(&org::counters_path(data_dir, org_id), &summary)?;
    Ok(recorded)
}

/// Full snapshot for the pull path. An organization with no recorded
/// violations (or one that was never provisioned) yields an empty summary,
/// not an error.
pub fn get_summary(data_dir: &Path, org_id: &str) -> Result<Summary, StoreError> {
    org::validate_org_id(org_id)?;
    Ok(load(data_dir, org_id)?)
}

/// Clears all counters for the organization. Explicit admin action; never a
/// side effect of a read.
pub fn reset_summary(data_dir: &Path, org_id: &str) -> Result<(), StoreError> {
    org::validate_org_id(org_id)?;
    org::provision(data_dir, org_id)?;
    org::write_json_atomic(&org::counters_path(data_dir, org_id), &Summary::new())?;
    Ok(())
}
