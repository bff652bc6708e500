use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// One violation-update push, fanned out to every dashboard subscribed to the
/// organization's room.
#[derive(Debug, Clone)]
pub struct ViolationUpdate {
    pub user_id: String,
    pub violation_type: String,
    pub name: String,
    pub count: u64,
    pub recorded_at: DateTime<Utc>,
}

impl ViolationUpdate {
    /// The JSON text frame sent over the wire.
    pub fn frame(&self) -> String {
        json!({
            "event": "violation_update",
            "user_id": self.user_id,
            "violation_type": self.violation_type,
            "name": self.name,
            "count": self.count,
            "recorded_at": self.recorded_at.to_rfc3339(),
        })
        .to_string()
    }
}

/// Per-organization broadcast rooms. Delivery is best-effort: there is no
/// replay and no acknowledgment, a dashboard that is offline at publish time
/// catches up via the summary pull path.
#[derive(Clone)]
pub struct Rooms {
    inner: Arc<Mutex<HashMap<String, broadcast::Sender<ViolationUpdate>>>>,
    capacity: usize,
}

impl Rooms {
    pub fn new(capacity: usize) -> Self {
        Rooms {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Joins the organization's room, creating it lazily. Dropping the
    /// receiver leaves the room.
    pub fn subscribe(&self, org_id: &str) -> broadcast::Receiver<ViolationUpdate> {
        let mut rooms = self.inner.lock().expect("rooms lock poisoned");
        let capacity = self.capacity;
        rooms
            .entry(org_id.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe()
    }

    /// Delivers to every current subscriber of the organization's room. A
    /// room with no subscribers left is pruned.
    pub fn publish(&self, org_id: &str, event: ViolationUpdate) {
        let mut rooms = self.inner.lock().expect("rooms lock poisoned");
        if let Some(tx) = rooms.get(org_id) {
            if tx.send(event).is_err() {
                rooms.remove(org_id);
            }
        }
    }
}
