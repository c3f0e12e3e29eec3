use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::router::HubState;
use crate::service::broadcaster::ConnectionStats;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub services: Services,
    /// Flat summaries kept for older dashboards.
    pub database: String,
    pub websocket: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Services {
    pub database: DatabaseHealth,
    pub websocket: WebsocketHealth,
    pub api: ApiHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connected: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebsocketHealth {
    pub status: String,
    pub server_running: bool,
    pub clients_total: usize,
    pub clients_active: usize,
    pub clients_inactive: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: String,
    /// Seconds since the router was built.
    pub uptime: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebsocketReport {
    pub websocket: WebsocketCheck,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebsocketCheck {
    pub server_running: bool,
    pub clients_total: usize,
    pub clients_active: usize,
    pub clients_inactive: usize,
    pub last_check: DateTime<Utc>,
}

/// `None` when the broadcaster actor no longer answers.
async fn connection_stats(state: &HubState) -> Option<ConnectionStats> {
    state
        .broadcaster
        .stats()
        .await
        .inspect_err(|e| warn!(error = %e, "broadcaster did not answer health check"))
        .ok()
}

/// GET /health
pub async fn health(State(state): State<HubState>) -> Json<HealthResponse> {
    let connected = state.storage.ping().await;
    let stats = connection_stats(&state).await;
    let running = stats.is_some();
    let stats = stats.unwrap_or_default();
    let db_status = if connected { "connected" } else { "disconnected" };

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        services: Services {
            database: DatabaseHealth {
                status: db_status.to_string(),
                connected,
            },
            websocket: WebsocketHealth {
                status: if running { "running" } else { "stopped" }.to_string(),
                server_running: running,
                clients_total: stats.total,
                clients_active: stats.active,
                clients_inactive: stats.inactive,
            },
            api: ApiHealth {
                status: "running".to_string(),
                uptime: state.started_at.elapsed().as_secs_f64(),
            },
        },
        database: db_status.to_string(),
        websocket: if running {
            format!("{}/{} clients active", stats.active, stats.total)
        } else {
            "WebSocket server not running".to_string()
        },
    })
}

/// GET /health/websocket
pub async fn websocket_health(State(state): State<HubState>) -> Json<WebsocketReport> {
    let stats = connection_stats(&state).await;
    let running = stats.is_some();
    let stats = stats.unwrap_or_default();
    Json(WebsocketReport {
        websocket: WebsocketCheck {
            server_running: running,
            clients_total: stats.total,
            clients_active: stats.active,
            clients_inactive: stats.inactive,
            last_check: Utc::now(),
        },
    })
}
