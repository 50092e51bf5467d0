//! API routes modules.
//!
//! Organized by functionality:
//! - `users` - Registration, login and the caller's profile
//! - `auth` - Token refresh, logout and access checks
//! - `groups` / `permissions` - Administration of the two catalogs
//! - `memberships` - User-to-group and group-to-permission links
//!
//! Everything except registration and login requires a bearer token. The
//! administrative routes act as the token's user.

pub mod auth;
pub mod groups;
pub mod memberships;
pub mod permissions;
pub mod users;

use axum::Router;
use serde::Deserialize;

use crate::server::AppState;

/// Body of the create and rename requests for named entities.
#[derive(Debug, Deserialize)]
pub struct NameBody {
    pub name: String,
}

/// Query of the lookup-by-name routes.
#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

/// Every route under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", users::user_routes())
        .nest("/auth", auth::auth_routes())
        .nest("/groups", groups::group_routes())
        .nest("/permissions", permissions::permission_routes())
        .nest("/user-groups", memberships::user_group_routes())
        .nest("/group-permissions", memberships::group_permission_routes())
}
