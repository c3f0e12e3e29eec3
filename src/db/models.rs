use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbUser {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DbCamera {
    pub id: String,
    pub name: String,
    pub rtsp_url: String,
    pub location: Option<String>,
    pub enabled: bool,
    pub is_streaming: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Camera row joined with the number of alerts it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DbCameraWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub camera: DbCamera,
    pub alert_count: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbAlert {
    pub id: String,
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    pub face_count: i64,
    pub confidence: Option<f64>,
    pub snapshot_url: Option<String>,
    /// Raw JSON text.
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCamera {
    pub name: String,
    pub rtsp_url: String,
    pub location: Option<String>,
    pub enabled: bool,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct CameraPatch {
    pub name: Option<String>,
    pub rtsp_url: Option<String>,
    /// `Some(None)` clears the location.
    pub location: Option<Option<String>>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub camera_id: String,
    pub face_count: i64,
    pub confidence: Option<f64>,
    pub snapshot_url: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AlertPage {
    pub alerts: Vec<DbAlert>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SystemCounts {
    pub total_cameras: i64,
    pub enabled_cameras: i64,
    pub streaming_cameras: i64,
    pub total_alerts: i64,
    pub alerts_last_24h: i64,
}
