//! Association endpoints.
//!
//! - `/api/user-groups` - which users belong to which groups
//! - `/api/group-permissions` - which permissions each group is granted

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use warden_auth::prelude::*;

use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupBody {
    pub user_id: String,
    pub group_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPermissionBody {
    pub group_id: String,
    pub permission_id: String,
}

pub fn user_group_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user_group))
        .route("/{user_id}", get(user_groups_of))
        .route(
            "/{user_id}/{group_id}",
            get(find_user_group).delete(delete_user_group),
        )
}

pub fn group_permission_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_group_permission))
        .route(
            "/{group_id}/{permission_id}",
            get(find_group_permission).delete(delete_group_permission),
        )
}

// ---- user groups ----

async fn create_user_group(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Json(body): Json<UserGroupBody>,
) -> Result<impl IntoResponse, AuthError> {
    let membership = state
        .services
        .user_groups
        .create(&session.user_id, &body.user_id, &body.group_id)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

async fn user_groups_of(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UserGroup>>, AuthError> {
    let memberships = state
        .services
        .user_groups
        .find_by_user_id(&session.user_id, &user_id)
        .await?;
    Ok(Json(memberships))
}

async fn find_user_group(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path((user_id, group_id)): Path<(String, String)>,
) -> Result<Json<UserGroup>, AuthError> {
    let membership = state
        .services
        .user_groups
        .find(&session.user_id, &user_id, &group_id)
        .await?;
    Ok(Json(membership))
}

async fn delete_user_group(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path((user_id, group_id)): Path<(String, String)>,
) -> Result<StatusCode, AuthError> {
    state
        .services
        .user_groups
        .delete(&session.user_id, &user_id, &group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- group permissions ----

async fn create_group_permission(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Json(body): Json<GroupPermissionBody>,
) -> Result<impl IntoResponse, AuthError> {
    let grant = state
        .services
        .group_permissions
        .create(&session.user_id, &body.group_id, &body.permission_id)
        .await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

async fn find_group_permission(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path((group_id, permission_id)): Path<(String, String)>,
) -> Result<Json<GroupPermission>, AuthError> {
    let grant = state
        .services
        .group_permissions
        .find(&session.user_id, &group_id, &permission_id)
        .await?;
    Ok(Json(grant))
}

async fn delete_group_permission(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path((group_id, permission_id)): Path<(String, String)>,
) -> Result<StatusCode, AuthError> {
    state
        .services
        .group_permissions
        .delete(&session.user_id, &group_id, &permission_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
