//! User storage.
//!
//! Reads only. Users are inserted inside the registration transaction, see
//! [`crate::registration`].

use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use tracing::instrument;
use warden_auth::storage::User;

use crate::{PgPool, StorageResult};

/// `(id, full_name, username, email, password, created_at, updated_at, deleted_at)`
pub(crate) type UserRow = (
    String,
    String,
    String,
    String,
    String,
    OffsetDateTime,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

pub(crate) const USER_COLUMNS: &str =
    "id, full_name, username, email, password, created_at, updated_at, deleted_at";

pub(crate) fn from_row(row: UserRow) -> User {
    let (id, full_name, username, email, password_hash, created_at, updated_at, deleted_at) = row;
    User {
        id,
        full_name,
        username,
        email,
        password_hash,
        created_at,
        updated_at,
        deleted_at,
    }
}

/// User storage operations.
pub struct UserStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStorage<'a> {
    /// Create a new user storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let row: Option<UserRow> = query_as(&sql).bind(id).fetch_optional(self.pool).await?;
        Ok(row.map(from_row))
    }

    /// Find a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND deleted_at IS NULL"
        );
        let row: Option<UserRow> = query_as(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(from_row))
    }

    /// Find a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        let row: Option<UserRow> = query_as(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(from_row))
    }
}
