use axum::http::{HeaderValue, Method, header};
use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::db::Storage;
use crate::error::ApiErrorResponse;
use crate::handlers::{alerts, auth, cameras, health, ws};
use crate::service::auth::TokenIssuer;
use crate::service::broadcaster::BroadcasterHandle;
use crate::service::login_limiter::{LoginLimiter, login_limiter};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct HubState {
    pub config: Arc<Config>,
    pub storage: Storage,
    pub broadcaster: BroadcasterHandle,
    pub tokens: Arc<TokenIssuer>,
    pub login_limiter: Arc<LoginLimiter>,
    pub started_at: Instant,
}

impl HubState {
    pub fn new(config: Arc<Config>, storage: Storage, broadcaster: BroadcasterHandle) -> Self {
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.jwt_expiry());
        Self {
            tokens: Arc::new(tokens),
            login_limiter: Arc::new(login_limiter(config.login_attempts_per_minute)),
            started_at: Instant::now(),
            config,
            storage,
            broadcaster,
        }
    }
}

pub fn hub_router(state: HubState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify", get(auth::verify))
        .route("/cameras", get(cameras::list).post(cameras::create))
        .route(
            "/cameras/{id}",
            get(cameras::get_one)
                .put(cameras::update)
                .delete(cameras::remove),
        )
        .route("/cameras/{id}/start", post(cameras::start))
        .route("/cameras/{id}/stop", post(cameras::stop))
        .route("/cameras/{id}/alerts", get(alerts::list_for_camera))
        .route("/alerts", post(alerts::ingest));

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(ws::root))
        .route("/health", get(health::health))
        .route("/health/websocket", get(health::websocket_health))
        .nest("/api", api)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| {
            HeaderValue::from_str(o)
                .inspect_err(|e| warn!(origin = %o, error = %e, "ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiErrorResponse::new("NOT_FOUND", "Route not found")),
    )
}
