pub mod config;
pub mod counter;
pub mod db;
pub mod error;
pub mod http;
pub mod org;
pub mod roster;
pub mod rooms;

use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use config::Config;
pub use http::build_router;
pub use rooms::{Rooms, ViolationUpdate};

/// Shared per-process state behind the router. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    db: Mutex<Connection>,
    rooms: Rooms,
    // Serializes the counters read-modify-write per organization; different
    // organizations proceed in parallel.
    org_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    // Session token -> admin email. Tokens live for the process lifetime.
    sessions: Mutex<HashMap<String, String>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let conn = db::open_db(&config.data_dir)?;
        let rooms = Rooms::new(config.room_capacity);
        Ok(AppState {
            inner: Arc::new(Inner {
                config,
                db: Mutex::new(conn),
                rooms,
                org_locks: Mutex::new(HashMap::new()),
                sessions: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.config.data_dir
    }

    pub fn rooms(&self) -> &Rooms {
        &self.inner.rooms
    }

    pub fn db(&self) -> MutexGuard<'_, Connection> {
        self.inner.db.lock().expect("credentials db lock poisoned")
    }

    pub fn org_lock(&self, org_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.org_locks.lock().expect("org locks poisoned");
        locks
            .entry(org_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    pub fn insert_session(&self, token: String, email: String) {
        let mut sessions = self.inner.sessions.lock().expect("sessions lock poisoned");
        sessions.insert(token, email);
    }

    pub fn session_email(&self, token: &str) -> Option<String> {
        let sessions = self.inner.sessions.lock().expect("sessions lock poisoned");
        sessions.get(token).cloned()
    }
}
