//! SQL DDL for initializing the hub database.
//! SQLite-first design; statements are applied one by one on connect.

/// SQLite schema with:
/// - text primary keys holding UUIDs
/// - `users.username` UNIQUE
/// - cameras owned by a user, alerts owned by a camera, both `ON DELETE CASCADE`
/// - booleans stored as INTEGER 0/1, timestamps as RFC3339 text
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cameras (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    rtsp_url TEXT NOT NULL,
    location TEXT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    is_streaming INTEGER NOT NULL DEFAULT 0,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cameras_user_id ON cameras(user_id);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY NOT NULL,
    camera_id TEXT NOT NULL REFERENCES cameras(id) ON DELETE CASCADE,
    timestamp TEXT NOT NULL,
    face_count INTEGER NOT NULL DEFAULT 1,
    confidence REAL NULL,
    snapshot_url TEXT NULL,
    metadata TEXT NULL -- JSON, serialized as text
);

CREATE INDEX IF NOT EXISTS idx_alerts_camera_timestamp ON alerts(camera_id, timestamp);
"#;
