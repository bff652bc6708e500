use anyhow::{bail, Context};
use rand::Rng;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::StoreError;

pub const ROSTER_FILE_NAME: &str = "roster.json";
pub const COUNTERS_FILE_NAME: &str = "counters.json";

const ORG_ID_LEN: usize = 6;
const ORG_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CREATE_ATTEMPTS: usize = 8;

pub fn generate_org_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ORG_ID_LEN)
        .map(|_| {
            let i = rng.gen_range(0..ORG_ID_ALPHABET.len());
            ORG_ID_ALPHABET[i] as char
        })
        .collect()
}

/// Organization IDs arrive from untrusted clients and are used as directory
/// names, so anything outside a short alphanumeric token is rejected.
pub fn validate_org_id(org_id: &str) -> Result<(), StoreError> {
    if org_id.len() < 6 || org_id.len() > 8 || !org_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StoreError::invalid(format!(
            "org_id must be 6-8 alphanumeric characters, got {org_id:?}"
        )));
    }
    Ok(())
}

pub fn org_dir(data_dir: &Path, org_id: &str) -> PathBuf {
    data_dir.join(org_id)
}

pub fn roster_path(data_dir: &Path, org_id: &str) -> PathBuf {
    org_dir(data_dir, org_id).join(ROSTER_FILE_NAME)
}

pub fn counters_path(data_dir: &Path, org_id: &str) -> PathBuf {
    org_dir(data_dir, org_id).join(COUNTERS_FILE_NAME)
}

pub fn exists(data_dir: &Path, org_id: &str) -> bool {
    org_dir(data_dir, org_id).is_dir()
}

/// Idempotent: creates the organization directory with an empty roster and
/// empty counters, leaving any existing files alone.
pub fn provision(data_dir: &Path, org_id: &str) -> anyhow::Result<()> {
    let dir = org_dir(data_dir, org_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create org directory {}", dir.to_string_lossy()))?;

    let roster = roster_path(data_dir, org_id);
    if !roster.is_file() {
        write_json_atomic(&roster, &serde_json::json!([]))?;
    }
    let counters = counters_path(data_dir, org_id);
    if !counters.is_file() {
        write_json_atomic(&counters, &serde_json::json!({}))?;
    }
    Ok(())
}

/// Allocates a fresh organization: generates an unused ID and provisions its
/// files. IDs are not guaranteed collision-free, so retry a bounded number of
/// times against the directory set before giving up.
pub fn create_org(data_dir: &Path) -> anyhow::Result<String> {
    for _ in 0..CREATE_ATTEMPTS {
        let org_id = generate_org_id();
        if exists(data_dir, &org_id) {
            continue;
        }
        provision(data_dir, &org_id)?;
        return Ok(org_id);
    }
    bail!("could not allocate an unused organization id")
}

/// Writes a full JSON snapshot durably: serialize to a temp file, fsync,
/// rename over the destination, then sync the directory entry. A crash
/// mid-write leaves the previous snapshot intact. The temp name is unique
/// per call so concurrent writers to the same snapshot cannot truncate each
/// other's temp file out from under the rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot");
    let tmp = path.with_file_name(format!("{file_name}.{}.tmp", Uuid::new_v4()));
    let data = serde_json::to_string_pretty(value).context("failed to serialize snapshot")?;
    {
        let mut f = File::create(&tmp)
            .with_context(|| format!("failed to create temp file {}", tmp.to_string_lossy()))?;
        f.write_all(data.as_bytes())
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        f.sync_all()
            .with_context(|| format!("failed to sync {}", tmp.to_string_lossy()))?;
    }
    std::fs::rename(&tmp, path).with_context(|| {
        format!(
            "failed to move snapshot into place at {}",
            path.to_string_lossy()
        )
    })?;
    // The rename is only durable once the directory entry itself is synced.
    if let Some(parent) = path.parent() {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .with_context(|| format!("failed to sync directory {}", parent.to_string_lossy()))?;
    }
    Ok(())
}
