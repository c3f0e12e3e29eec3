use face_detect_hub::config::Config;
use face_detect_hub::db::Storage;
use face_detect_hub::router::{HubState, hub_router};
use face_detect_hub::service::broadcaster::{self, BroadcasterHandle, ConnectionStats};
use face_detect_hub::types::ws::WsMessage;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::{
    fs,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn serve() -> (SocketAddr, BroadcasterHandle, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut db_path = std::env::temp_dir();
    db_path.push(format!(
        "face-detect-hub-ws-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let storage = Storage::connect(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open test database");
    let handle = broadcaster::spawn().await.expect("broadcaster spawn failed");
    let state = HubState::new(Arc::new(Config::default()), storage, handle.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    let app = hub_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, handle, db_path)
}

async fn next_json(client: &mut Client) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for a message")
        .expect("socket closed")
        .expect("socket error");
    serde_json::from_str(msg.to_text().expect("non-text frame")).expect("frame was not JSON")
}

async fn wait_for_total(handle: &BroadcasterHandle, total: usize) -> ConnectionStats {
    for _ in 0..100 {
        let stats = handle.stats().await.unwrap();
        if stats.total == total {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("connection count never reached {total}");
}

#[tokio::test]
async fn socket_lifecycle_from_welcome_to_close() {
    let (addr, handle, db_path) = serve().await;

    let (mut client, _) = connect_async(format!("ws://{addr}/"))
        .await
        .expect("websocket handshake failed");

    let welcome = next_json(&mut client).await;
    assert_eq!(welcome["type"], "connection");
    assert_eq!(wait_for_total(&handle, 1).await.active, 1);

    handle.broadcast(WsMessage::camera_status("cam-1", true));
    let status = next_json(&mut client).await;
    assert_eq!(status["type"], "camera_status");
    assert_eq!(status["data"]["cameraId"], "cam-1");

    // dashboards may send anything; it is ignored
    client
        .send(Message::text("hello"))
        .await
        .expect("send failed");

    client.close(None).await.expect("close failed");
    wait_for_total(&handle, 0).await;

    let _ = fs::remove_file(&db_path);
}

#[tokio::test]
async fn dropped_socket_is_forgotten() {
    let (addr, handle, db_path) = serve().await;

    let (mut first, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    let (mut second, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    next_json(&mut first).await;
    next_json(&mut second).await;
    wait_for_total(&handle, 2).await;

    // no close frame: the connection just goes away
    drop(first);
    wait_for_total(&handle, 1).await;

    handle.broadcast(WsMessage::camera_status("cam-2", false));
    let status = next_json(&mut second).await;
    assert_eq!(status["data"]["cameraId"], "cam-2");

    let _ = fs::remove_file(&db_path);
}
