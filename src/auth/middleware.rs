use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::AuthContext;
use crate::app::AppState;
use crate::error::ErrorResponse;
use crate::middleware::RequestIdExt;

/// Handler argument that only resolves for callers with a valid bearer token
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

impl std::ops::Deref for RequireAuth {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Authorization header must be `Bearer <token>`")]
    InvalidFormat,
    #[error("Invalid or expired token")]
    InvalidToken,
}

/// 401 carrying the request id so clients can quote it
pub struct AuthRejection {
    error: AuthError,
    request_id: Option<String>,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: "UNAUTHORIZED".to_string(),
            message: self.error.to_string(),
            request_id: self.request_id,
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Token part of `Authorization: Bearer <token>`; the scheme is case-insensitive
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidFormat)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidFormat);
    }
    match token.trim() {
        "" => Err(AuthError::MissingToken),
        token => Ok(token),
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let reject = |error: AuthError| AuthRejection {
            error,
            request_id: parts.headers.request_id().map(str::to_string),
        };

        let token = bearer_token(&parts.headers).map_err(reject)?;

        let claims = state.verifier.verify_token(token).map_err(|e| {
            tracing::warn!(error = %e, "Bearer token rejected");
            reject(AuthError::InvalidToken)
        })?;

        let context = AuthContext::from_claims(claims).map_err(|e| {
            tracing::warn!(error = e, "Bearer token has no usable subject");
            reject(AuthError::InvalidToken)
        })?;

        Ok(RequireAuth(context))
    }
}
