use anyhow::Context;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

use crate::error::StoreError;

const SALT_LEN: usize = 16;

/// Opens (creating if needed) the global admin-credentials database under the
/// data directory.
pub fn open_db(data_dir: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(data_dir).with_context(|| {
        format!(
            "failed to create data directory {}",
            data_dir.to_string_lossy()
        )
    })?;
    let db_path = data_dir.join("admins.sqlite3");
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS admins(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            salt TEXT NOT NULL,
            org_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

/// Fails with `DuplicateEmail` when the address is already registered.
/// Signup checks this before provisioning an organization, so a rejected
/// signup leaves no orphan directory behind.
pub fn ensure_email_free(conn: &Connection, email: &str) -> Result<(), StoreError> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM admins WHERE email = ?", [email], |r| {
            r.get(0)
        })
        .optional()
        .context("failed to query admins")?;
    if existing.is_some() {
        return Err(StoreError::DuplicateEmail);
    }
    Ok(())
}

/// Registers a new admin account bound to an already-provisioned
/// organization. Fails with `DuplicateEmail` if the address is taken.
pub fn create_admin(
    conn: &Connection,
    email: &str,
    password: &str,
    org_id: &str,
) -> Result<(), StoreError> {
    ensure_email_free(conn, email)?;

    let salt = generate_salt();
    let password_hash = hash_password(&salt, password);
    conn.execute(
        "INSERT INTO admins(id, email, password_hash, salt, org_id, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            email,
            password_hash,
            salt,
            org_id,
            Utc::now().to_rfc3339(),
        ),
    )
    .context("failed to insert admin")?;
    Ok(())
}

/// Checks credentials and returns the admin's organization. Unknown email and
/// wrong password are indistinguishable to the caller.
pub fn verify_admin(conn: &Connection, email: &str, password: &str) -> Result<String, StoreError> {
    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT password_hash, salt, org_id FROM admins WHERE email = ?",
            [email],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()
        .context("failed to query admins")?;

    let Some((password_hash, salt, org_id)) = row else {
        return Err(StoreError::BadCredentials);
    };
    if hash_password(&salt, password) != password_hash {
        return Err(StoreError::BadCredentials);
    }
    Ok(org_id)
}

/// Organization currently bound to an admin account.
pub fn admin_org(conn: &Connection, email: &str) -> Result<String, StoreError> {
    let org_id: Option<String> = conn
        .query_row("SELECT org_id FROM admins WHERE email = ?", [email], |r| {
            r.get(0)
        })
        .optional()
        .context("failed to query admins")?;
    org_id.ok_or(StoreError::BadCredentials)
}

/// Rebinds an admin account to a freshly generated organization. The prior
/// organization's files are orphaned, not deleted.
pub fn reassign_org(conn: &Connection, email: &str, org_id: &str) -> Result<(), StoreError> {
    let changed = conn
        .execute(
            "UPDATE admins SET org_id = ? WHERE email = ?",
            (org_id, email),
        )
        .context("failed to update admin org")?;
    if changed == 0 {
        return Err(StoreError::BadCredentials);
    }
    Ok(())
}
