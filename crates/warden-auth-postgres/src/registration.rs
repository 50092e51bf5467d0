//! Repeatable-read registration transaction.
//!
//! The transaction is rolled back when a [`PgRegistration`] is dropped
//! without [`commit`](RegistrationTransaction::commit).

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::transaction::Transaction;
use sqlx_postgres::Postgres;
use tracing::instrument;
use warden_auth::storage::{Group, RegistrationTransaction, User, UserGroup};
use warden_auth::{AuthError, AuthResult, Entity};

use crate::user::{USER_COLUMNS, UserRow, from_row};
use crate::{PgPool, StorageError};

/// An open registration transaction.
pub struct PgRegistration {
    tx: Transaction<'static, Postgres>,
}

impl PgRegistration {
    /// Begins a transaction at `REPEATABLE READ`.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is available or the isolation level
    /// cannot be set.
    pub async fn begin(pool: &PgPool) -> Result<Self, StorageError> {
        let mut tx = pool.begin().await?;
        query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;
        Ok(Self { tx })
    }

    async fn find_user_where(&mut self, column: &str, value: &str) -> AuthResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 AND deleted_at IS NULL"
        );
        let row: Option<UserRow> = query_as(&sql)
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StorageError::from(e).into_auth(Entity::User))?;
        Ok(row.map(from_row))
    }
}

#[async_trait]
impl RegistrationTransaction for PgRegistration {
    async fn find_user_by_username(&mut self, username: &str) -> AuthResult<Option<User>> {
        self.find_user_where("username", username).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> AuthResult<Option<User>> {
        self.find_user_where("email", email).await
    }

    async fn find_group_by_name(&mut self, name: &str) -> AuthResult<Option<Group>> {
        let row: Option<(String, String)> = query_as("SELECT id, name FROM groups WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StorageError::from(e).into_auth(Entity::Group))?;
        Ok(row.map(|(id, name)| Group { id, name }))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&mut self, user: &User) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO users (id, full_name, username, email, password, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StorageError::from_write(e).into_auth(Entity::User))?;
        Ok(())
    }

    #[instrument(skip(self, membership), fields(user_id = %membership.user_id, group_id = %membership.group_id))]
    async fn insert_user_group(&mut self, membership: &UserGroup) -> AuthResult<()> {
        query("INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)")
            .bind(&membership.user_id)
            .bind(&membership.group_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StorageError::from_write(e).into_auth(Entity::UserGroup))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AuthResult<()> {
        self.tx.commit().await.map_err(|e| {
            // Serialization failures under REPEATABLE READ surface here too.
            AuthError::storage(format!("registration commit failed: {e}"))
        })
    }
}
