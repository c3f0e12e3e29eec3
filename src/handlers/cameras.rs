use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::error::HubError;
use crate::middleware::auth::AuthUser;
use crate::middleware::validation::ValidatedJson;
use crate::router::HubState;
use crate::types::alert::AlertView;
use crate::types::camera::{
    CameraEnvelope, CameraListEnvelope, CameraView, CreateCameraRequest, DeleteResponse,
    UpdateCameraRequest,
};
use crate::types::ws::WsMessage;

/// Alerts embedded in a single-camera response.
const RECENT_ALERTS: i64 = 10;

/// GET /api/cameras
pub async fn list(
    State(state): State<HubState>,
    user: AuthUser,
) -> Result<Json<CameraListEnvelope>, HubError> {
    let rows = state.storage.list_cameras(&user.id).await?;
    info!(username = %user.username, count = rows.len(), "cameras listed");
    Ok(Json(CameraListEnvelope {
        cameras: rows.into_iter().map(CameraView::from).collect(),
    }))
}

/// POST /api/cameras
pub async fn create(
    State(state): State<HubState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateCameraRequest>,
) -> Result<(StatusCode, Json<CameraEnvelope>), HubError> {
    let camera = state.storage.create_camera(&user.id, req.into()).await?;
    info!(username = %user.username, camera_id = %camera.id, name = %camera.name, "camera created");
    Ok((
        StatusCode::CREATED,
        Json(CameraEnvelope {
            camera: camera.into(),
        }),
    ))
}

/// GET /api/cameras/{id} -> camera with its most recent alerts.
pub async fn get_one(
    State(state): State<HubState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CameraEnvelope>, HubError> {
    let camera = state
        .storage
        .get_camera(&user.id, &id)
        .await?
        .ok_or(HubError::NotFound("Camera"))?;
    let alerts = state.storage.recent_alerts(&camera.id, RECENT_ALERTS).await?;

    let mut view = CameraView::from(camera);
    view.alerts = Some(alerts.into_iter().map(AlertView::from).collect());
    Ok(Json(CameraEnvelope { camera: view }))
}

/// PUT /api/cameras/{id}
pub async fn update(
    State(state): State<HubState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCameraRequest>,
) -> Result<Json<CameraEnvelope>, HubError> {
    let camera = state
        .storage
        .update_camera(&user.id, &id, req.into())
        .await?
        .ok_or(HubError::NotFound("Camera"))?;
    info!(camera_id = %camera.id, name = %camera.name, "camera updated");
    Ok(Json(CameraEnvelope {
        camera: camera.into(),
    }))
}

/// DELETE /api/cameras/{id} -> alerts go with the camera.
pub async fn remove(
    State(state): State<HubState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, HubError> {
    let camera = state
        .storage
        .delete_camera(&user.id, &id)
        .await?
        .ok_or(HubError::NotFound("Camera"))?;
    info!(camera_id = %camera.id, name = %camera.name, "camera deleted");
    Ok(Json(DeleteResponse {
        success: true,
        message: "Camera deleted successfully".to_string(),
    }))
}

/// POST /api/cameras/{id}/start
pub async fn start(
    State(state): State<HubState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CameraEnvelope>, HubError> {
    set_streaming(state, user, id, true).await
}

/// POST /api/cameras/{id}/stop
pub async fn stop(
    State(state): State<HubState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CameraEnvelope>, HubError> {
    set_streaming(state, user, id, false).await
}

/// Flip the streaming flag and announce it. Frame processing itself lives in the
/// external detection worker, which reports back through `POST /api/alerts`.
async fn set_streaming(
    state: HubState,
    user: AuthUser,
    id: String,
    is_streaming: bool,
) -> Result<Json<CameraEnvelope>, HubError> {
    let camera = state
        .storage
        .set_streaming(&user.id, &id, is_streaming)
        .await?
        .ok_or(HubError::NotFound("Camera"))?;

    state
        .broadcaster
        .broadcast(WsMessage::camera_status(camera.id.clone(), is_streaming));

    info!(
        camera_id = %camera.id,
        name = %camera.name,
        is_streaming,
        "camera streaming state changed"
    );
    Ok(Json(CameraEnvelope {
        camera: camera.into(),
    }))
}
