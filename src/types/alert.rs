use crate::db::models::{DbAlert, NewAlert};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Body the detection worker posts for each positive frame.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    #[serde(default)]
    #[serde(rename = "cameraId")]
    #[validate(length(min = 1, message = "Camera ID is required"))]
    pub camera_id: String,
    #[serde(default = "default_face_count")]
    #[serde(rename = "faceCount")]
    #[validate(range(min = 0, message = "Face count cannot be negative"))]
    pub face_count: i64,
    #[validate(range(min = 0.0, max = 1.0, message = "Confidence must be between 0 and 1"))]
    pub confidence: Option<f64>,
    #[serde(rename = "snapshotUrl")]
    #[validate(url(message = "Snapshot URL must be a valid URL"))]
    pub snapshot_url: Option<String>,
    pub metadata: Option<Value>,
}

fn default_face_count() -> i64 {
    1
}

impl CreateAlertRequest {
    pub fn into_new_alert(self) -> Result<NewAlert, serde_json::Error> {
        let metadata = self.metadata.as_ref().map(serde_json::to_string).transpose()?;
        Ok(NewAlert {
            camera_id: self.camera_id,
            face_count: self.face_count,
            confidence: self.confidence,
            snapshot_url: self.snapshot_url,
            metadata,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub id: String,
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    pub face_count: i64,
    pub confidence: Option<f64>,
    pub snapshot_url: Option<String>,
    pub metadata: Option<Value>,
}

impl From<DbAlert> for AlertView {
    fn from(a: DbAlert) -> Self {
        // rows are only written through `into_new_alert`, so the text is valid JSON
        let metadata = a
            .metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok());
        Self {
            id: a.id,
            camera_id: a.camera_id,
            timestamp: a.timestamp,
            face_count: a.face_count,
            confidence: a.confidence,
            snapshot_url: a.snapshot_url,
            metadata,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(default)]
pub struct PageQuery {
    #[validate(range(min = 1, message = "Page must be positive"))]
    pub page: u32,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(query: PageQuery, total: i64) -> Self {
        let limit = i64::from(query.limit.max(1));
        Self {
            page: query.page,
            limit: query.limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertListEnvelope {
    pub alerts: Vec<AlertView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertEnvelope {
    pub alert: AlertView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_round_up() {
        let q = PageQuery { page: 2, limit: 20 };
        assert_eq!(Pagination::new(q, 0).pages, 0);
        assert_eq!(Pagination::new(q, 20).pages, 1);
        assert_eq!(Pagination::new(q, 41).pages, 3);
    }

    #[test]
    fn limit_over_hundred_is_rejected() {
        assert!(PageQuery { page: 1, limit: 101 }.validate().is_err());
        assert!(PageQuery { page: 0, limit: 10 }.validate().is_err());
        assert!(PageQuery::default().validate().is_ok());
    }

    #[test]
    fn alert_body_defaults_face_count() {
        let req: CreateAlertRequest =
            serde_json::from_str(r#"{"cameraId":"c-1","confidence":0.93}"#).unwrap();
        assert_eq!(req.face_count, 1);
        assert!(req.validate().is_ok());

        let bad: CreateAlertRequest =
            serde_json::from_str(r#"{"cameraId":"c-1","confidence":1.5}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn alert_errors_use_wire_field_names() {
        let bad: CreateAlertRequest =
            serde_json::from_str(r#"{"cameraId":"","snapshotUrl":"nope"}"#).unwrap();
        let errs = bad.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("cameraId"));
        assert!(fields.contains_key("snapshotUrl"));
    }
}
