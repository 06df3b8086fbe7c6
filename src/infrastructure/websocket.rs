//! WebSocket handler for client connections
//!
//! One frame in, one frame out. A frame that fails to parse gets an
//! `error` response (with its correlation id recovered when possible)
//! and the connection stays up.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::dto::{ClientRequest, ServerResponse};
use crate::infrastructure::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel for sending responses to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerResponse>();

    tracing::info!("New WebSocket connection established");

    // Forward responses from the channel to the socket
    let send_task = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&response) {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientRequest>(&text) {
                Ok(request) => {
                    let response = {
                        let mut game = state.game.write().await;
                        state.sync.handle_request(&mut game, request)
                    };
                    if tx.send(response).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to parse request: {}", e);
                    let error = ServerResponse::Error {
                        request_id: extract_request_id(&text),
                        message: format!("invalid request: {e}"),
                    };
                    if tx.send(error).is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket connection closed by client");
                break;
            }
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    tracing::info!("WebSocket connection terminated");
}

/// Best-effort correlation id recovery from a frame that failed to parse
/// as a request.
fn extract_request_id(text: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()?
        .get("request_id")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_recovered_from_malformed_frame() {
        let id = extract_request_id(r#"{"type": "warp", "request_id": "r9"}"#);
        assert_eq!(id.as_deref(), Some("r9"));
    }

    #[test]
    fn test_unrecoverable_frames_yield_no_id() {
        assert_eq!(extract_request_id("not json"), None);
        assert_eq!(extract_request_id(r#"{"request_id": 7}"#), None);
    }
}
