use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_client(state, socket))
}

/// Pumps hub frames to the socket and treats every text frame from the
/// client as its new location.
async fn serve_client(state: Arc<AppState>, socket: WebSocket) {
    let hub = state.hub().clone();
    let Some((id, mut frames)) = hub.register().await else {
        warn!("Realtime hub is unavailable, closing websocket");
        return;
    };
    debug!(client_id = %id, "Websocket client connected");

    let (mut sink, mut stream) = socket.split();

    let mut outgoing = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let incoming_hub = hub.clone();
    let mut incoming = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(location) => {
                    incoming_hub.set_location(id, location.as_str().trim().to_string());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut outgoing => incoming.abort(),
        _ = &mut incoming => outgoing.abort(),
    }

    hub.unregister(id);
    debug!(client_id = %id, "Websocket client disconnected");
}
