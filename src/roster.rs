use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::StoreError;
use crate::org;

/// Display name used when a reported user was never registered.
pub const PLACEHOLDER_NAME: &str = "placeholder";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
}

fn load(data_dir: &Path, org_id: &str) -> anyhow::Result<Vec<RosterEntry>> {
    let path = org::roster_path(data_dir, org_id);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read roster {}", path.to_string_lossy()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("roster {} is invalid JSON", path.to_string_lossy()))
}

/// Registers (or re-registers) an exam taker. Replaces any existing entry
/// with the same exam ID, so re-registration updates the display name and
/// the roster never grows duplicates.
pub fn upsert_user(
    data_dir: &Path,
    org_id: &str,
    exam_id: &str,
    name: &str,
) -> Result<(), StoreError> {
    let exam_id = exam_id.trim();
    let name = name.trim();
    if exam_id.is_empty() {
        return Err(StoreError::invalid("missing exam_id"));
    }
    if name.is_empty() {
        return Err(StoreError::invalid("missing name"));
    }
    org::validate_org_id(org_id)?;
    if !org::exists(data_dir, org_id) {
        return Err(StoreError::UnknownOrg(org_id.to_string()));
    }

    let mut entries = load(data_dir, org_id)?;
    entries.retain(|e| e.id != exam_id);
    entries.push(RosterEntry {
        id: exam_id.to_string(),
        name: name.to_string(),
    });
    org::write_json_atomic(&org::roster_path(data_dir, org_id), &entries)?;
    Ok(())
}

/// Resolves a display name for the counters, falling back to a placeholder
/// when the user (or the whole roster) is unknown. Never fails: a missing
/// roster is the same as an empty one here.
pub fn lookup_name(data_dir: &Path, org_id: &str, user_id: &str) -> String {
    match load(data_dir, org_id) {
        Ok(entries) => entries
            .into_iter()
            .find(|e| e.id == user_id)
            .map(|e| e.name)
            .unwrap_or_else(|| PLACEHOLDER_NAME.to_string()),
        Err(_) => PLACEHOLDER_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn upsert_replaces_by_exam_id() {
        let data_dir = temp_dir("proctord-roster");
        org::provision(&data_dir, "ABC123").expect("provision");

        upsert_user(&data_dir, "ABC123", "E1", "Alice").expect("first upsert");
        upsert_user(&data_dir, "ABC123", "E1", "Alice B").expect("second upsert");

        let entries = load(&data_dir, "ABC123").expect("load");
        assert_eq!(entries.len(), 1, "re-registration must not duplicate");
        assert_eq!(entries[0].name, "Alice B");
    }

    #[test]
    fn upsert_is_idempotent_with_identical_args() {
        let data_dir = temp_dir("proctord-roster-idem");
        org::provision(&data_dir, "ABC123").expect("provision");

        upsert_user(&data_dir, "ABC123", "E1", "Alice").expect("upsert");
        upsert_user(&data_dir, "ABC123", "E1", "Alice").expect("upsert again");

        let entries = load(&data_dir, "ABC123").expect("load");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Alice");
    }

    #[test]
    fn upsert_validates_fields_and_org() {
        let data_dir = temp_dir("proctord-roster-validate");
        org::provision(&data_dir, "ABC123").expect("provision");

        assert!(matches!(
            upsert_user(&data_dir, "ABC123", "", "Alice"),
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            upsert_user(&data_dir, "ABC123", "E1", "  "),
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            upsert_user(&data_dir, "ZZZ999", "E1", "Alice"),
            Err(StoreError::UnknownOrg(_))
        ));
    }

    #[test]
    fn lookup_falls_back_to_placeholder() {
        let data_dir = temp_dir("proctord-roster-lookup");
        org::provision(&data_dir, "ABC123").expect("provision");
        upsert_user(&data_dir, "ABC123", "E1", "Alice").expect("upsert");

        assert_eq!(lookup_name(&data_dir, "ABC123", "E1"), "Alice");
        assert_eq!(lookup_name(&data_dir, "ABC123", "E2"), PLACEHOLDER_NAME);
        assert_eq!(lookup_name(&data_dir, "NOORG1", "E1"), PLACEHOLDER_NAME);
    }
}
