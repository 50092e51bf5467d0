//! PostgreSQL storage backend for Warden Auth
//!
//! Provides persistent storage for:
//!
//! - Users
//! - Groups and permissions
//! - Group memberships (`user_groups`) and permission grants (`group_permissions`)
//!
//! Tables are created by [`schema::ensure_schema`]. Association tables
//! cascade on delete of either end.
//!
//! # Example
//!
//! ```ignore
//! use warden_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/warden").await?;
//! storage.ensure_schema().await?;
//!
//! let group = storage.groups().find_by_name("DEFAULT").await?;
//! ```

pub mod group;
pub mod group_permission;
pub mod health;
pub mod permission;
pub mod registration;
pub mod schema;
pub mod storage_adapters;
pub mod user;
pub mod user_group;

use std::sync::Arc;
use std::time::Duration;

use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;
use warden_auth::{AuthError, Entity};

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use group::GroupStorage;
pub use group_permission::GroupPermissionStorage;
pub use health::{HealthSettings, PoolHealthMonitor};
pub use permission::PermissionStorage;
pub use registration::PgRegistration;
pub use user::UserStorage;
pub use user_group::UserGroupStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// A unique constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A foreign key rejected the write.
    #[error("Missing reference: {0}")]
    MissingReference(String),
}

impl StorageError {
    /// Classifies a write error, separating constraint violations from
    /// other database failures.
    #[must_use]
    pub fn from_write(err: sqlx_core::Error) -> Self {
        if let sqlx_core::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return Self::MissingReference(db_err.message().to_string());
            }
        }
        Self::Database(err)
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Converts into the core error, reporting conflicts against `entity`.
    #[must_use]
    pub fn into_auth(self, entity: Entity) -> AuthError {
        match self {
            Self::Conflict(_) if entity == Entity::User => AuthError::IdentityTaken,
            Self::Conflict(_) => AuthError::already_exists(entity),
            other => {
                tracing::error!(entity = %entity, error = %other, "database operation failed");
                AuthError::storage(other.to_string())
            }
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Pool settings
// =============================================================================

/// Connection pool sizing and lifetimes.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 3,
            acquire_timeout: Duration::from_secs(10),
            max_lifetime: Duration::from_secs(60 * 60),
        }
    }
}

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for identity and authorization data.
///
/// Holds a connection pool and hands out borrowed storage types per table.
/// The core storage traits are implemented on this type in
/// [`storage_adapters`].
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        Self::connect_with(database_url, &PoolSettings::default()).await
    }

    /// Create new storage by connecting with explicit pool settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect_with(
        database_url: &str,
        settings: &PoolSettings,
    ) -> Result<Self, StorageError> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .max_lifetime(settings.max_lifetime)
            .connect(database_url)
            .await?;
        tracing::info!(
            max_connections = settings.max_connections,
            "connected to PostgreSQL"
        );
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a reference to the Arc-wrapped pool.
    #[must_use]
    pub fn pool_arc(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// Creates tables and indexes that do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        schema::ensure_schema(&self.pool).await
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn users(&self) -> UserStorage<'_> {
        UserStorage::new(&self.pool)
    }

    #[must_use]
    pub fn groups(&self) -> GroupStorage<'_> {
        GroupStorage::new(&self.pool)
    }

    #[must_use]
    pub fn permissions(&self) -> PermissionStorage<'_> {
        PermissionStorage::new(&self.pool)
    }

    #[must_use]
    pub fn user_groups(&self) -> UserGroupStorage<'_> {
        UserGroupStorage::new(&self.pool)
    }

    #[must_use]
    pub fn group_permissions(&self) -> GroupPermissionStorage<'_> {
        GroupPermissionStorage::new(&self.pool)
    }
}

// =============================================================================
// Tests
// =============================================================================
