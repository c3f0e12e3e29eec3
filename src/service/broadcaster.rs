use crate::error::HubError;
use crate::types::ws::WsMessage;

use axum::extract::ws::Utf8Bytes;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

/// Per-connection outbox depth. A client this far behind misses messages.
pub const OUTBOX_CAPACITY: usize = 64;

pub type ConnectionId = u64;
pub type Outbox = mpsc::Sender<Utf8Bytes>;

/// Messages handled by the broadcaster actor.
#[derive(Debug)]
pub enum BroadcasterMessage {
    /// Add a connection; replies with its id once the welcome is queued.
    Register(Outbox, RpcReplyPort<ConnectionId>),
    /// Drop a connection (socket closed or errored).
    Unregister(ConnectionId),
    /// Best-effort delivery to every open connection.
    Broadcast(WsMessage),
    /// Count connections and evict the ones whose socket task has gone.
    Stats(RpcReplyPort<ConnectionStats>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

/// Handle for interacting with the broadcaster actor.
#[derive(Clone)]
pub struct BroadcasterHandle {
    actor: ActorRef<BroadcasterMessage>,
}

impl BroadcasterHandle {
    pub async fn register(&self, outbox: Outbox) -> Result<ConnectionId, HubError> {
        ractor::call!(self.actor, BroadcasterMessage::Register, outbox)
            .map_err(|e| HubError::RactorError(format!("Register RPC failed: {e}")))
    }

    pub fn unregister(&self, id: ConnectionId) {
        let _ = ractor::cast!(self.actor, BroadcasterMessage::Unregister(id));
    }

    /// Never fails towards the caller; a dead actor only loses the message.
    pub fn broadcast(&self, message: WsMessage) {
        if let Err(e) = ractor::cast!(self.actor, BroadcasterMessage::Broadcast(message)) {
            warn!(error = %e, "broadcaster unreachable; message dropped");
        }
    }

    pub async fn stats(&self) -> Result<ConnectionStats, HubError> {
        ractor::call!(self.actor, BroadcasterMessage::Stats)
            .map_err(|e| HubError::RactorError(format!("Stats RPC failed: {e}")))
    }
}

struct BroadcasterState {
    next_id: ConnectionId,
    clients: HashMap<ConnectionId, Outbox>,
}

impl BroadcasterState {
    /// Queue `text` for one client. `false` means the client is gone.
    fn deliver(id: ConnectionId, outbox: &Outbox, text: &Utf8Bytes) -> bool {
        match outbox.try_send(text.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(connection = id, "outbox full; client misses this message");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// ractor-based status broadcaster
struct Broadcaster;

#[ractor::async_trait]
impl Actor for Broadcaster {
    type Msg = BroadcasterMessage;
    type State = BroadcasterState;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _arguments: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!("Broadcaster started");
        Ok(BroadcasterState {
            next_id: 1,
            clients: HashMap::new(),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            BroadcasterMessage::Register(outbox, reply) => {
                let id = state.next_id;
                state.next_id += 1;
                match serde_json::to_string(&WsMessage::welcome()) {
                    Ok(text) => {
                        let _ = BroadcasterState::deliver(id, &outbox, &Utf8Bytes::from(text));
                    }
                    Err(e) => error!(error = %e, "failed to serialize welcome"),
                }
                state.clients.insert(id, outbox);
                info!(
                    connection = id,
                    total = state.clients.len(),
                    "websocket client connected"
                );
                let _ = reply.send(id);
            }
            BroadcasterMessage::Unregister(id) => {
                if state.clients.remove(&id).is_some() {
                    info!(
                        connection = id,
                        total = state.clients.len(),
                        "websocket client disconnected"
                    );
                }
            }
            BroadcasterMessage::Broadcast(message) => {
                self.handle_broadcast(state, message);
            }
            BroadcasterMessage::Stats(reply) => {
                let total = state.clients.len();
                state.clients.retain(|_, outbox| !outbox.is_closed());
                let active = state.clients.len();
                let _ = reply.send(ConnectionStats {
                    total,
                    active,
                    inactive: total - active,
                });
            }
        }
        Ok(())
    }
}

impl Broadcaster {
    fn handle_broadcast(&self, state: &mut BroadcasterState, message: WsMessage) {
        let kind = message.kind();
        let text = match serde_json::to_string(&message) {
            Ok(text) => Utf8Bytes::from(text),
            Err(e) => {
                error!(kind, error = %e, "failed to serialize broadcast");
                return;
            }
        };

        let before = state.clients.len();
        state
            .clients
            .retain(|id, outbox| BroadcasterState::deliver(*id, outbox, &text));
        let sent = state.clients.len();

        if sent < before {
            debug!(kind, evicted = before - sent, "evicted closed connections");
        }
        if sent > 0 {
            debug!(kind, sent, "broadcast delivered");
        }
    }
}

/// Async spawn of the broadcaster actor and return a handle.
pub async fn spawn() -> Result<BroadcasterHandle, HubError> {
    // unnamed: ractor's registry rejects duplicate names and tests spawn several
    let (actor, _jh) = Actor::spawn(None, Broadcaster, ())
        .await
        .map_err(|e| HubError::RactorError(format!("failed to spawn Broadcaster: {e}")))?;
    Ok(BroadcasterHandle { actor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn kind_of(text: &Utf8Bytes) -> String {
        let v: Value = serde_json::from_str(text.as_str()).unwrap();
        v["type"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_sends_welcome_then_broadcasts() {
        let handle = spawn().await.unwrap();
        let (tx, mut rx) = mpsc::channel(OUTBOX_CAPACITY);
        handle.register(tx).await.unwrap();

        handle.broadcast(WsMessage::camera_status("cam-1", true));
        handle.stats().await.unwrap();

        assert_eq!(kind_of(&rx.recv().await.unwrap()), "connection");
        let status: Value = serde_json::from_str(rx.recv().await.unwrap().as_str()).unwrap();
        assert_eq!(status["type"], "camera_status");
        assert_eq!(status["data"]["cameraId"], "cam-1");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_connection_is_evicted_without_error() {
        let handle = spawn().await.unwrap();
        let (open_tx, mut open_rx) = mpsc::channel(OUTBOX_CAPACITY);
        let (closed_tx, closed_rx) = mpsc::channel(OUTBOX_CAPACITY);
        handle.register(open_tx).await.unwrap();
        handle.register(closed_tx).await.unwrap();
        drop(closed_rx);

        handle.broadcast(WsMessage::camera_status("cam-1", false));
        let stats = handle.stats().await.unwrap();
        assert_eq!(
            stats,
            ConnectionStats {
                total: 1,
                active: 1,
                inactive: 0
            }
        );

        assert_eq!(kind_of(&open_rx.recv().await.unwrap()), "connection");
        assert_eq!(kind_of(&open_rx.recv().await.unwrap()), "camera_status");
    }

    #[tokio::test]
    async fn stats_counts_then_evicts_inactive() {
        let handle = spawn().await.unwrap();
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        handle.register(tx).await.unwrap();
        drop(rx);

        let first = handle.stats().await.unwrap();
        assert_eq!(first.total, 1);
        assert_eq!(first.inactive, 1);
        assert_eq!(handle.stats().await.unwrap(), ConnectionStats::default());
    }

    #[tokio::test]
    async fn full_outbox_keeps_connection() {
        let handle = spawn().await.unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        handle.register(tx).await.unwrap();

        // welcome fills the single slot; this one is skipped
        handle.broadcast(WsMessage::camera_status("cam-1", true));
        assert_eq!(handle.stats().await.unwrap().active, 1);

        assert_eq!(kind_of(&rx.recv().await.unwrap()), "connection");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_removes_connection() {
        let handle = spawn().await.unwrap();
        let (tx, _rx) = mpsc::channel(OUTBOX_CAPACITY);
        let id = handle.register(tx).await.unwrap();
        handle.unregister(id);
        assert_eq!(handle.stats().await.unwrap().total, 0);
    }
}
