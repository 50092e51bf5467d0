//! Group administration under `/api/groups`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use warden_auth::prelude::*;

use super::{NameBody, NameQuery};
use crate::server::AppState;

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(find_by_name).post(create))
        .route("/{id}", get(find_by_id).put(update).delete(remove))
}

async fn create(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, AuthError> {
    let group = state.services.groups.create(&session.user_id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn find_by_id(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path(id): Path<String>,
) -> Result<Json<Group>, AuthError> {
    Ok(Json(state.services.groups.find_by_id(&session.user_id, &id).await?))
}

async fn find_by_name(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Query(query): Query<NameQuery>,
) -> Result<Json<Group>, AuthError> {
    Ok(Json(
        state
            .services
            .groups
            .find_by_name(&session.user_id, &query.name)
            .await?,
    ))
}

async fn update(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path(id): Path<String>,
    Json(body): Json<NameBody>,
) -> Result<Json<Group>, AuthError> {
    Ok(Json(
        state
            .services
            .groups
            .update(&session.user_id, &id, &body.name)
            .await?,
    ))
}

async fn remove(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path(id): Path<String>,
) -> Result<StatusCode, AuthError> {
    state.services.groups.delete(&session.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
