use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::router::HubState;
use crate::service::broadcaster::{BroadcasterHandle, OUTBOX_CAPACITY};

#[derive(Debug, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub version: String,
    pub status: String,
    pub websocket: String,
}

/// GET / -> websocket upgrade for dashboards, service banner for everything else.
pub async fn root(
    State(state): State<HubState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => {
            let broadcaster = state.broadcaster.clone();
            ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
        }
        Err(_) => Json(Banner {
            message: "Face Detection Backend API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "running".to_string(),
            websocket: format!("ws://localhost:{}", state.config.port),
        })
        .into_response(),
    }
}

/// Registers the socket with the broadcaster and pumps its outbox until either side closes.
async fn handle_socket(socket: WebSocket, broadcaster: BroadcasterHandle) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel(OUTBOX_CAPACITY);

    let id = match broadcaster.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "could not register websocket client");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    let mut forward = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!(connection = id, error = %e, "websocket send failed");
                break;
            }
        }
    });

    // dashboards never send application messages; read only to notice the close
    let mut inbound = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(data)) => trace!(connection = id, len = data.len(), "ping"),
                Ok(_) => {}
                Err(e) => {
                    debug!(connection = id, error = %e, "websocket receive failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut forward => inbound.abort(),
        _ = &mut inbound => forward.abort(),
    }

    broadcaster.unregister(id);
}
