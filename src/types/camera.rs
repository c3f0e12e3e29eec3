use crate::db::models::{CameraPatch, DbCamera, DbCameraWithCount, NewCamera};
use crate::types::alert::AlertView;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError};

/// Accepts only parseable `rtsp://` URLs.
pub fn validate_rtsp_url(value: &str) -> Result<(), ValidationError> {
    let url = Url::parse(value).map_err(|_| {
        ValidationError::new("url").with_message("Valid RTSP URL is required".into())
    })?;
    if url.scheme() != "rtsp" {
        return Err(ValidationError::new("rtsp_scheme")
            .with_message("URL must be an RTSP stream (rtsp://...)".into()));
    }
    Ok(())
}

/// Camera names are stored trimmed, so the 1-100 character rule applies to the trimmed text.
pub fn validate_camera_name(value: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if (1..=100).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("length")
            .with_message("Camera name must be 1-100 characters".into()))
    }
}

fn normalize_location(location: Option<String>) -> Option<String> {
    location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCameraRequest {
    #[validate(custom(function = "validate_camera_name"))]
    pub name: String,
    #[serde(rename = "rtspUrl")]
    #[validate(custom(function = "validate_rtsp_url"))]
    pub rtsp_url: String,
    #[validate(length(max = 200, message = "Location too long"))]
    pub location: Option<String>,
}

impl From<CreateCameraRequest> for NewCamera {
    fn from(req: CreateCameraRequest) -> Self {
        NewCamera {
            name: req.name.trim().to_string(),
            rtsp_url: req.rtsp_url,
            location: normalize_location(req.location),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateCameraRequest {
    #[validate(custom(function = "validate_camera_name"))]
    pub name: Option<String>,
    #[serde(rename = "rtspUrl")]
    #[validate(custom(function = "validate_rtsp_url"))]
    pub rtsp_url: Option<String>,
    /// A blank string clears the location.
    #[validate(length(max = 200, message = "Location too long"))]
    pub location: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateCameraRequest> for CameraPatch {
    fn from(req: UpdateCameraRequest) -> Self {
        CameraPatch {
            name: req.name.map(|n| n.trim().to_string()),
            rtsp_url: req.rtsp_url,
            location: req.location.map(|l| normalize_location(Some(l))),
            enabled: req.enabled,
        }
    }
}

/// Camera as rendered to the dashboard. Which extras are present depends on the route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraView {
    #[serde(flatten)]
    pub camera: DbCamera,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<AlertView>>,
}

impl From<DbCamera> for CameraView {
    fn from(camera: DbCamera) -> Self {
        Self {
            camera,
            alert_count: None,
            alerts: None,
        }
    }
}

impl From<DbCameraWithCount> for CameraView {
    fn from(row: DbCameraWithCount) -> Self {
        Self {
            camera: row.camera,
            alert_count: Some(row.alert_count),
            alerts: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CameraEnvelope {
    pub camera: CameraView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CameraListEnvelope {
    pub cameras: Vec<CameraView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, url: &str) -> CreateCameraRequest {
        CreateCameraRequest {
            name: name.to_string(),
            rtsp_url: url.to_string(),
            location: None,
        }
    }

    #[test]
    fn accepts_rtsp_camera() {
        assert!(create("Front Door", "rtsp://10.0.0.5:554/stream").validate().is_ok());
    }

    #[test]
    fn rejects_non_rtsp_scheme() {
        let errs = create("Front Door", "http://10.0.0.5/stream")
            .validate()
            .unwrap_err();
        let fields = errs.field_errors();
        assert_eq!(fields.len(), 1);
        let messages: Vec<String> = fields
            .values()
            .flat_map(|errs| errs.iter())
            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .collect();
        assert_eq!(messages, vec!["URL must be an RTSP stream (rtsp://...)".to_string()]);
    }

    #[test]
    fn rejects_empty_name_and_garbage_url() {
        let errs = create("", "not a url").validate().unwrap_err();
        let fields = errs.field_errors();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("rtspUrl"));
    }

    #[test]
    fn whitespace_only_name_is_rejected() {
        assert!(create("   ", "rtsp://10.0.0.5:554/stream").validate().is_err());
        assert!(create("  Lobby  ", "rtsp://10.0.0.5:554/stream").validate().is_ok());
        let update = UpdateCameraRequest {
            name: Some("\t \n".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn update_allows_empty_patch() {
        assert!(UpdateCameraRequest::default().validate().is_ok());
    }

    #[test]
    fn blank_location_clears_on_update() {
        let patch: CameraPatch = UpdateCameraRequest {
            location: Some("   ".to_string()),
            ..Default::default()
        }
        .into();
        assert_eq!(patch.location, Some(None));
    }
}
