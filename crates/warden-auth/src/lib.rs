//! # warden-auth
//!
//! Authentication, session tokens and group-based authorization for Warden.
//!
//! This crate provides:
//! - A cache-aside layer over a key-value store with explicit not-found markers
//! - Repositories for users, groups, permissions and the links between them
//! - An access resolver that checks a principal's groups concurrently
//! - Paired access/refresh JWTs whose validity lives in the cache store
//! - Registration, login, refresh and logout orchestration
//! - Permission-gated administration and an idempotent seeder
//!
//! ## Modules
//!
//! - [`config`] - Token, cache and resolver configuration
//! - [`cache`] - Cache store trait, in-process store and cache-aside helper
//! - [`storage`] - Storage traits and the in-memory backend
//! - [`repository`] - Cache-aside repositories
//! - [`access`] - Access resolution over group memberships
//! - [`token`] - JWT codec and token lifecycle
//! - [`service`] - Use cases consumed by the transport layer
//! - [`seed`] - Installation of reserved groups and permissions
//! - [`middleware`] - Axum bearer extractors and error responses

pub mod access;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod middleware;
pub mod password;
pub mod repository;
pub mod seed;
pub mod service;
pub mod storage;
pub mod token;

pub use access::{AccessResolver, MembershipSource};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, Entity, ErrorKind};
pub use service::Services;

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use warden_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::access::{AccessResolver, MembershipSource};
    pub use crate::cache::{CacheAside, CacheError, CacheLookup, CacheStore, LocalCache};
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, Entity, ErrorKind};
    pub use crate::middleware::{AuthState, BearerAuth, RefreshAuth};
    pub use crate::seed::{SeedReport, Seeder};
    pub use crate::service::{
        GroupPermissionService, GroupService, LoginRequest, PermissionService, RegisterRequest,
        Registered, Services, UserGroupService, UserInfo, UserService,
    };
    pub use crate::storage::{
        AuthStorage, Group, GroupPermission, MemoryStorage, Permission, User, UserGroup,
    };
    pub use crate::token::{Session, TokenManager, TokenPair, TokenType};
}
