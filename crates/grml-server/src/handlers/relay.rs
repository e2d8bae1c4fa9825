//! The websocket relay endpoint.
//!
//! Each socket runs in its own task: text frames read from the socket are
//! broadcast through the hub, frames queued for the client by the hub are
//! written to the socket. Frames are never parsed for routing; recognized
//! events are only logged.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use grml_app::Event;

use crate::error::ApiError;
use crate::hub::RelayHub;
use crate::state::AppState;

/// GET /ws
pub async fn upgrade(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let ws = ws.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(ws.on_upgrade(move |socket| serve(socket, state.hub)))
}

async fn serve(mut socket: WebSocket, hub: RelayHub) {
    let (id, mut outgoing) = hub.join();
    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let frame = text.as_str();
                    if let Some(event) = Event::parse(frame) {
                        tracing::debug!(client = %id, command = event.command(), "relaying");
                    }
                    hub.broadcast(id, frame);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!(client = %id, %err, "socket error");
                    break;
                }
            },
            frame = outgoing.recv() => match frame {
                Some(frame) => {
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
    hub.leave(id);
}
