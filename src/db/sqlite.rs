use crate::db::models::{
    AlertPage, CameraPatch, DbAlert, DbCamera, DbCameraWithCount, DbUser, NewAlert, NewCamera,
    SystemCounts,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::HubError;
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use uuid::Uuid;

pub type SqlitePool = Pool<Sqlite>;

const CAMERA_COLUMNS: &str =
    "id, name, rtsp_url, location, enabled, is_streaming, user_id, created_at, updated_at";
const ALERT_COLUMNS: &str =
    "id, camera_id, timestamp, face_count, confidence, snapshot_url, metadata";

/// Every camera and alert query that serves a user carries `user_id = ?`.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, HubError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), HubError> {
        // sqlx::query runs a single statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<DbUser, HubError> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"INSERT INTO users (id, username, password_hash, created_at)
               VALUES (?, ?, ?, ?)
               RETURNING id, username, password_hash, created_at"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<DbUser>, HubError> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Owner's cameras, newest first, each with its alert count.
    pub async fn list_cameras(&self, user_id: &str) -> Result<Vec<DbCameraWithCount>, HubError> {
        let rows = sqlx::query_as::<_, DbCameraWithCount>(
            r#"SELECT c.id, c.name, c.rtsp_url, c.location, c.enabled, c.is_streaming,
                      c.user_id, c.created_at, c.updated_at,
                      (SELECT COUNT(*) FROM alerts a WHERE a.camera_id = c.id) AS alert_count
               FROM cameras c
               WHERE c.user_id = ?
               ORDER BY c.created_at DESC, c.rowid DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_camera(&self, user_id: &str, id: &str) -> Result<Option<DbCamera>, HubError> {
        let camera = sqlx::query_as::<_, DbCamera>(&format!(
            "SELECT {CAMERA_COLUMNS} FROM cameras WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(camera)
    }

    /// Unscoped lookup for the alert ingestion path, which acts on behalf of the worker.
    pub async fn find_camera(&self, id: &str) -> Result<Option<DbCamera>, HubError> {
        let camera = sqlx::query_as::<_, DbCamera>(&format!(
            "SELECT {CAMERA_COLUMNS} FROM cameras WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(camera)
    }

    pub async fn create_camera(&self, user_id: &str, new: NewCamera) -> Result<DbCamera, HubError> {
        let now = Utc::now();
        let camera = sqlx::query_as::<_, DbCamera>(&format!(
            r#"INSERT INTO cameras (
                   id, name, rtsp_url, location, enabled, is_streaming, user_id, created_at, updated_at
               ) VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
               RETURNING {CAMERA_COLUMNS}"#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(new.name)
        .bind(new.rtsp_url)
        .bind(new.location)
        .bind(new.enabled)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(camera)
    }

    /// Apply a partial update. `None` when no camera with this id belongs to the owner.
    pub async fn update_camera(
        &self,
        user_id: &str,
        id: &str,
        patch: CameraPatch,
    ) -> Result<Option<DbCamera>, HubError> {
        let camera = sqlx::query_as::<_, DbCamera>(&format!(
            r#"UPDATE cameras SET
                   name = COALESCE(?, name),
                   rtsp_url = COALESCE(?, rtsp_url),
                   location = CASE WHEN ? THEN ? ELSE location END,
                   enabled = COALESCE(?, enabled),
                   updated_at = ?
               WHERE id = ? AND user_id = ?
               RETURNING {CAMERA_COLUMNS}"#
        ))
        .bind(patch.name)
        .bind(patch.rtsp_url)
        .bind(patch.location.is_some())
        .bind(patch.location.flatten())
        .bind(patch.enabled)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(camera)
    }

    pub async fn set_streaming(
        &self,
        user_id: &str,
        id: &str,
        is_streaming: bool,
    ) -> Result<Option<DbCamera>, HubError> {
        let camera = sqlx::query_as::<_, DbCamera>(&format!(
            r#"UPDATE cameras SET is_streaming = ?, updated_at = ?
               WHERE id = ? AND user_id = ?
               RETURNING {CAMERA_COLUMNS}"#
        ))
        .bind(is_streaming)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(camera)
    }

    /// Delete a camera and its alerts. Returns the removed row, if any.
    pub async fn delete_camera(&self, user_id: &str, id: &str) -> Result<Option<DbCamera>, HubError> {
        let mut tx = self.pool.begin().await?;

        let camera = sqlx::query_as::<_, DbCamera>(&format!(
            "SELECT {CAMERA_COLUMNS} FROM cameras WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(camera) = camera else {
            return Ok(None);
        };

        // alerts first, independent of the foreign_keys pragma
        sqlx::query("DELETE FROM alerts WHERE camera_id = ?")
            .bind(&camera.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cameras WHERE id = ? AND user_id = ?")
            .bind(&camera.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(camera))
    }

    pub async fn insert_alert(&self, new: NewAlert) -> Result<DbAlert, HubError> {
        let alert = sqlx::query_as::<_, DbAlert>(&format!(
            r#"INSERT INTO alerts (
                   id, camera_id, timestamp, face_count, confidence, snapshot_url, metadata
               ) VALUES (?, ?, ?, ?, ?, ?, ?)
               RETURNING {ALERT_COLUMNS}"#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(new.camera_id)
        .bind(Utc::now())
        .bind(new.face_count)
        .bind(new.confidence)
        .bind(new.snapshot_url)
        .bind(new.metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(alert)
    }

    /// Most recent alerts of a camera the caller has already resolved.
    pub async fn recent_alerts(&self, camera_id: &str, take: i64) -> Result<Vec<DbAlert>, HubError> {
        let alerts = sqlx::query_as::<_, DbAlert>(&format!(
            r#"SELECT {ALERT_COLUMNS} FROM alerts
               WHERE camera_id = ?
               ORDER BY timestamp DESC, rowid DESC
               LIMIT ?"#
        ))
        .bind(camera_id)
        .bind(take)
        .fetch_all(&self.pool)
        .await?;
        Ok(alerts)
    }

    /// One page of a camera's alerts, newest first. `page` is 1-based.
    pub async fn list_alerts(
        &self,
        user_id: &str,
        camera_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<AlertPage, HubError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);

        let alerts = sqlx::query_as::<_, DbAlert>(
            r#"SELECT a.id, a.camera_id, a.timestamp, a.face_count, a.confidence,
                      a.snapshot_url, a.metadata
               FROM alerts a
               JOIN cameras c ON c.id = a.camera_id
               WHERE a.camera_id = ? AND c.user_id = ?
               ORDER BY a.timestamp DESC, a.rowid DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(camera_id)
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM alerts a
               JOIN cameras c ON c.id = a.camera_id
               WHERE a.camera_id = ? AND c.user_id = ?"#,
        )
        .bind(camera_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AlertPage { alerts, total })
    }

    /// Process-wide aggregate counts for `system_stats`.
    pub async fn system_counts(&self) -> Result<SystemCounts, HubError> {
        let since = Utc::now() - Duration::hours(24);
        let counts = sqlx::query_as::<_, SystemCounts>(
            r#"SELECT
                   (SELECT COUNT(*) FROM cameras) AS total_cameras,
                   (SELECT COUNT(*) FROM cameras WHERE enabled = 1) AS enabled_cameras,
                   (SELECT COUNT(*) FROM cameras WHERE is_streaming = 1) AS streaming_cameras,
                   (SELECT COUNT(*) FROM alerts) AS total_alerts,
                   (SELECT COUNT(*) FROM alerts WHERE timestamp >= ?) AS alerts_last_24h"#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }
}
