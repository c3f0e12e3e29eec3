use face_detect_hub::db::Storage;
use face_detect_hub::service::auth::verify_password;
use face_detect_hub::service::broadcaster::{self, OUTBOX_CAPACITY};
use face_detect_hub::service::seed::{SeedOutcome, seed_admin};
use face_detect_hub::service::stats::publish_once;
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::mpsc;

async fn temp_storage(tag: &str) -> (Storage, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "face-detect-hub-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let storage = Storage::connect(&format!("sqlite:{}", path.display()))
        .await
        .expect("failed to open test database");
    (storage, path)
}

#[tokio::test]
async fn seed_runs_once() {
    let (storage, path) = temp_storage("seed").await;

    let SeedOutcome::Created { admin, cameras } =
        seed_admin(&storage, "admin", "admin-pass").await.unwrap()
    else {
        panic!("first seed should create the admin");
    };
    assert!(verify_password("admin-pass", &admin.password_hash));
    assert_eq!(cameras.len(), 3);
    assert_eq!(cameras.iter().filter(|c| !c.enabled).count(), 1);
    assert!(cameras.iter().all(|c| !c.is_streaming));

    match seed_admin(&storage, "admin", "other").await.unwrap() {
        SeedOutcome::Skipped(existing) => assert_eq!(existing.id, admin.id),
        other => panic!("second seed should skip, got {other:?}"),
    }
    assert_eq!(storage.list_cameras(&admin.id).await.unwrap().len(), 3);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn stats_are_published_only_with_listeners() {
    let (storage, path) = temp_storage("stats").await;
    seed_admin(&storage, "admin", "admin-pass").await.unwrap();
    let handle = broadcaster::spawn().await.unwrap();

    // nobody listening: nothing to deliver, nothing to fail
    publish_once(&storage, &handle).await;

    let (tx, mut rx) = mpsc::channel(OUTBOX_CAPACITY);
    handle.register(tx).await.unwrap();
    publish_once(&storage, &handle).await;
    handle.stats().await.unwrap();

    let welcome: Value = serde_json::from_str(rx.recv().await.unwrap().as_str()).unwrap();
    assert_eq!(welcome["type"], "connection");
    let stats: Value = serde_json::from_str(rx.recv().await.unwrap().as_str()).unwrap();
    assert_eq!(stats["type"], "system_stats");
    assert_eq!(stats["data"]["totalCameras"], 3);
    assert_eq!(stats["data"]["enabledCameras"], 2);
    assert_eq!(stats["data"]["totalAlerts"], 0);
    assert_eq!(stats["data"]["connectedClients"], 1);
    assert!(rx.try_recv().is_err());

    let _ = fs::remove_file(&path);
}
