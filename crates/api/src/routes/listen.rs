use advocacy_core::events::types::ContentEvent;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

use crate::state::AppState;

/// Live content-change feed for open pages.
pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/listen", get(listen))
}

async fn listen(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| forward_events(socket, state))
}

fn encode(event: &ContentEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode content event");
            None
        }
    }
}

/// Wait for the next event to forward. Lagging skips ahead to the oldest
/// event still buffered; `None` once the bus is gone.
async fn next_frame(rx: &mut Receiver<ContentEvent>) -> Option<String> {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(text) = encode(&event) {
                    return Some(text);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "listener fell behind, events dropped");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn send_text(socket: &mut WebSocket, text: String) -> bool {
    socket.send(Message::Text(text.into())).await.is_ok()
}

async fn forward_events(mut socket: WebSocket, state: AppState) {
    let mut rx = state.service().events().subscribe();
    if let Some(welcome) = encode(&ContentEvent::Welcome) {
        if !send_text(&mut socket, welcome).await {
            return;
        }
    }

    loop {
        tokio::select! {
            frame = next_frame(&mut rx) => match frame {
                Some(text) => {
                    if !send_text(&mut socket, text).await {
                        break;
                    }
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("listener disconnected");
}
