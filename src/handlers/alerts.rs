use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::error::HubError;
use crate::middleware::auth::{AuthUser, RequireWorkerKey};
use crate::middleware::validation::{ValidatedJson, ValidatedQuery};
use crate::router::HubState;
use crate::types::alert::{
    AlertEnvelope, AlertListEnvelope, AlertView, CreateAlertRequest, PageQuery, Pagination,
};
use crate::types::ws::WsMessage;

/// GET /api/cameras/{id}/alerts?page=&limit=
pub async fn list_for_camera(
    State(state): State<HubState>,
    user: AuthUser,
    Path(camera_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<AlertListEnvelope>, HubError> {
    state
        .storage
        .get_camera(&user.id, &camera_id)
        .await?
        .ok_or(HubError::NotFound("Camera"))?;

    let page = state
        .storage
        .list_alerts(&user.id, &camera_id, query.page, query.limit)
        .await?;

    Ok(Json(AlertListEnvelope {
        alerts: page.alerts.into_iter().map(AlertView::from).collect(),
        pagination: Pagination::new(query, page.total),
    }))
}

/// POST /api/alerts -> recorded by the detection worker, pushed to dashboards.
pub async fn ingest(
    State(state): State<HubState>,
    _worker: RequireWorkerKey,
    ValidatedJson(req): ValidatedJson<CreateAlertRequest>,
) -> Result<(StatusCode, Json<AlertEnvelope>), HubError> {
    let camera = state
        .storage
        .find_camera(&req.camera_id)
        .await?
        .ok_or(HubError::NotFound("Camera"))?;

    let alert = AlertView::from(state.storage.insert_alert(req.into_new_alert()?).await?);
    info!(
        camera_id = %camera.id,
        alert_id = %alert.id,
        face_count = alert.face_count,
        "alert recorded"
    );

    state
        .broadcaster
        .broadcast(WsMessage::new_alert(alert.clone(), &camera));

    Ok((StatusCode::CREATED, Json(AlertEnvelope { alert })))
}
