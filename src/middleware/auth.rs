use axum::RequestPartsExt;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};
use axum_extra::TypedHeader;
use headers::Authorization;
use headers::authorization::Bearer;
use subtle::ConstantTimeEq;

use crate::error::HubError;
use crate::router::HubState;

/// Header the detection worker uses to present its shared key.
pub const WORKER_KEY_HEADER: &str = "x-worker-key";

/// The caller behind a valid bearer token. Every owner-scoped query takes `id`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    HubState: FromRef<S>,
{
    type Rejection = HubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| HubError::MissingToken)?;

        let state = HubState::from_ref(state);
        let claims = state.tokens.verify(bearer.token())?;
        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
        })
    }
}

/// Ensure the request carries the configured worker key.
pub fn ensure_worker_key(headers: &HeaderMap, expected: Option<&str>) -> Result<(), HubError> {
    let expected = expected.ok_or(HubError::IngestDisabled)?;
    let provided = headers
        .get(WORKER_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(HubError::InvalidWorkerKey)?;

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(HubError::InvalidWorkerKey)
    }
}

/// Extractor guarding worker-only routes.
#[derive(Debug, Clone, Copy)]
pub struct RequireWorkerKey;

impl<S> FromRequestParts<S> for RequireWorkerKey
where
    S: Send + Sync,
    HubState: FromRef<S>,
{
    type Rejection = HubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = HubState::from_ref(state);
        ensure_worker_key(&parts.headers, state.config.worker_key.as_deref())?;
        Ok(Self)
    }
}
