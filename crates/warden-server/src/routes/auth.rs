//! Session endpoints.
//!
//! - `GET /api/auth/refresh-token` - rotate the pair, authenticated by the refresh token
//! - `DELETE /api/auth/logout` - revoke the pair of the presented access token
//! - `POST /api/auth/has-access` - ask whether a user holds any of a set of permissions

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use warden_auth::prelude::*;

use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasAccessRequest {
    pub user_id: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HasAccessResponse {
    pub has_access: bool,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/refresh-token", get(refresh_token))
        .route("/logout", delete(logout))
        .route("/has-access", post(has_access))
}

/// GET /api/auth/refresh-token
async fn refresh_token(
    State(state): State<AppState>,
    RefreshAuth(session): RefreshAuth,
) -> Result<Json<TokenPair>, AuthError> {
    let tokens = state
        .services
        .users
        .refresh_token(&session.user_id, &session.token_id)
        .await?;
    Ok(Json(tokens))
}

/// DELETE /api/auth/logout
async fn logout(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
) -> Result<StatusCode, AuthError> {
    state
        .services
        .users
        .logout(&session.user_id, &session.token_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/has-access
///
/// Answers `{"hasAccess": true}` or the denial as an error response.
async fn has_access(
    State(state): State<AppState>,
    BearerAuth(_caller): BearerAuth,
    Json(request): Json<HasAccessRequest>,
) -> Result<Json<HasAccessResponse>, AuthError> {
    let permissions: Vec<&str> = request.permissions.iter().map(String::as_str).collect();
    state
        .services
        .access
        .has_access(&request.user_id, &permissions)
        .await?;
    Ok(Json(HasAccessResponse { has_access: true }))
}
