use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::RequireAuth;

/// Caller identity as the API sees it
#[derive(Serialize)]
pub struct MeResponse<'a> {
    pub user_id: &'a str,
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub role: Option<&'a str>,
    pub secretariats: &'a [String],
    pub issuer: &'a str,
    pub audience: &'a str,
    pub expires_at: Option<DateTime<Utc>>,
}

/// GET /me
pub async fn get_me(RequireAuth(auth): RequireAuth) -> Response {
    let me = MeResponse {
        user_id: &auth.user_id,
        name: auth.name(),
        email: auth.email(),
        role: auth.role(),
        secretariats: auth.secretariats(),
        issuer: auth.issuer(),
        audience: auth.audience(),
        expires_at: auth.expires_at(),
    };
    Json(me).into_response()
}
