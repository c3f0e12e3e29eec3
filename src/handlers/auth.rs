use axum::{Json, extract::State};
use tracing::info;

use crate::error::HubError;
use crate::middleware::auth::AuthUser;
use crate::middleware::validation::ValidatedJson;
use crate::router::HubState;
use crate::service::auth::verify_login;
use crate::types::auth::{LoginRequest, LoginResponse, LogoutResponse, TokenOwner, VerifyResponse};

/// POST /api/auth/login -> bearer token plus the public user record.
pub async fn login(
    State(state): State<HubState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, HubError> {
    if state.login_limiter.check_key(&req.username).is_err() {
        info!(username = %req.username, "login rate limited");
        return Err(HubError::RateLimited);
    }

    let user = state.storage.find_user_by_username(&req.username).await?;
    let password = req.password;
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let valid =
        tokio::task::spawn_blocking(move || verify_login(&password, stored_hash.as_deref()))
            .await?;

    let Some(user) = user.filter(|_| valid) else {
        info!(username = %req.username, "login failed: invalid credentials");
        return Err(HubError::InvalidCredentials);
    };

    let token = state.tokens.issue(&user)?;
    info!(username = %user.username, "login successful");
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// POST /api/auth/logout -> tokens are stateless; the client drops its copy.
pub async fn logout() -> Json<LogoutResponse> {
    Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
        action: "remove_token".to_string(),
    })
}

/// GET /api/auth/verify
pub async fn verify(user: AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        message: "Token is valid".to_string(),
        user: TokenOwner {
            id: user.id,
            username: user.username,
        },
    })
}
