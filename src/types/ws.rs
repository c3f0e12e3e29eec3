//! Envelopes pushed over the real-time channel as `{"type": ..., "data": ...}`.

use crate::db::models::{DbCamera, SystemCounts};
use crate::types::alert::AlertView;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsMessage {
    Connection(ConnectionInfo),
    CameraStatus(CameraStatus),
    NewAlert(AlertNotice),
    SystemStats(SystemStats),
}

impl WsMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WsMessage::Connection(_) => "connection",
            WsMessage::CameraStatus(_) => "camera_status",
            WsMessage::NewAlert(_) => "new_alert",
            WsMessage::SystemStats(_) => "system_stats",
        }
    }

    pub fn welcome() -> Self {
        WsMessage::Connection(ConnectionInfo {
            message: "connected to face detection dashboard".to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn camera_status(camera_id: impl Into<String>, is_streaming: bool) -> Self {
        WsMessage::CameraStatus(CameraStatus {
            camera_id: camera_id.into(),
            is_streaming,
            timestamp: Utc::now(),
        })
    }

    pub fn new_alert(alert: AlertView, camera: &DbCamera) -> Self {
        WsMessage::NewAlert(AlertNotice {
            alert,
            camera: AlertCamera::from(camera),
            timestamp: Utc::now(),
        })
    }

    pub fn system_stats(counts: SystemCounts, connected_clients: usize) -> Self {
        WsMessage::SystemStats(SystemStats {
            counts,
            connected_clients,
            timestamp: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionInfo {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatus {
    pub camera_id: String,
    pub is_streaming: bool,
    pub timestamp: DateTime<Utc>,
}

/// The part of a camera every socket may see. The channel is unauthenticated, so
/// the stream URL (often carrying credentials) and the owner id stay out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertCamera {
    pub id: String,
    pub name: String,
}

impl From<&DbCamera> for AlertCamera {
    fn from(camera: &DbCamera) -> Self {
        Self {
            id: camera.id.clone(),
            name: camera.name.clone(),
        }
    }
}

/// Alert fields are flattened, with a camera summary and the push time alongside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotice {
    #[serde(flatten)]
    pub alert: AlertView,
    pub camera: AlertCamera,
    /// Push time; the alert's own `timestamp` is the detection time.
    #[serde(rename = "pushedAt")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    #[serde(flatten)]
    pub counts: SystemCounts,
    pub connected_clients: usize,
    pub timestamp: DateTime<Utc>,
}
