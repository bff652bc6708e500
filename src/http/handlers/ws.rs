use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::http::error::ApiError;
use crate::rooms::ViolationUpdate;
use crate::{org, AppState};

/// Upgrades a dashboard connection and binds it to one organization's room
/// for its whole lifetime. Delivery is best-effort; a dashboard that lags
/// past the room buffer just misses events and reconciles via the summary
/// pull.
pub async fn subscribe(
    ws: WebSocketUpgrade,
    Path(org_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    org::validate_org_id(&org_id)?;
    let rx = state.rooms().subscribe(&org_id);
    tracing::debug!(org_id = %org_id, "dashboard subscribed");
    Ok(ws.on_upgrade(move |socket| room_loop(socket, rx, org_id)))
}

async fn room_loop(
    socket: WebSocket,
    mut rx: broadcast::Receiver<ViolationUpdate>,
    org_id: String,
) {
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(update) => {
                    if sink.send(Message::Text(update.frame())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(org_id = %org_id, skipped, "dashboard lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                // Inbound frames are ignored; the channel is push-only.
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }
    tracing::debug!(org_id = %org_id, "dashboard disconnected");
}
