//! Account endpoints.
//!
//! - `POST /api/users/register` - create an account and open a session
//! - `POST /api/users/login` - open a session
//! - `GET /api/users/me` - profile of the authenticated user

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use warden_auth::prelude::*;

use crate::server::AppState;

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: UserInfo,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

/// POST /api/users/register
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let Registered { user, tokens } = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { user, tokens })))
}

/// POST /api/users/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let tokens = state.services.users.login(request).await?;
    Ok(Json(tokens))
}

/// GET /api/users/me
async fn me(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
) -> Result<Json<UserInfo>, AuthError> {
    let info = state.services.users.get_user_info(&session.user_id).await?;
    Ok(Json(info))
}
