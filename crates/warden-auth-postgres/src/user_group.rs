//! Group membership storage and the per-group permission check.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tracing::instrument;
use warden_auth::storage::UserGroup;

use crate::{PgPool, StorageError, StorageResult};

/// Membership storage operations.
pub struct UserGroupStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> UserGroupStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a membership.
    ///
    /// # Errors
    ///
    /// `Conflict` for a duplicate pair, `MissingReference` if the user or
    /// group does not exist.
    #[instrument(skip(self, membership), fields(user_id = %membership.user_id, group_id = %membership.group_id))]
    pub async fn create(&self, membership: &UserGroup) -> StorageResult<()> {
        query("INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)")
            .bind(&membership.user_id)
            .bind(&membership.group_id)
            .execute(self.pool)
            .await
            .map_err(StorageError::from_write)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find(&self, user_id: &str, group_id: &str) -> StorageResult<Option<UserGroup>> {
        let row: Option<(String, String)> = query_as(
            r#"
            SELECT user_id, group_id
            FROM user_groups
            WHERE user_id = $1 AND group_id = $2
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(user_id, group_id)| UserGroup { user_id, group_id }))
    }

    #[instrument(skip(self))]
    pub async fn find_by_user_id(&self, user_id: &str) -> StorageResult<Vec<UserGroup>> {
        let rows: Vec<(String, String)> = query_as(
            r#"
            SELECT user_id, group_id
            FROM user_groups
            WHERE user_id = $1
            ORDER BY group_id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, group_id)| UserGroup { user_id, group_id })
            .collect())
    }

    /// Delete a membership. Returns whether a row was removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str, group_id: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM user_groups WHERE user_id = $1 AND group_id = $2")
            .bind(user_id)
            .bind(group_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the group holds a permission with the given name.
    #[instrument(skip(self))]
    pub async fn group_has_permission(
        &self,
        group_id: &str,
        permission_name: &str,
    ) -> StorageResult<bool> {
        let (granted,): (bool,) = query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM group_permissions gp
                JOIN permissions p ON p.id = gp.permission_id
                WHERE gp.group_id = $1 AND p.name = $2
            )
            "#,
        )
        .bind(group_id)
        .bind(permission_name)
        .fetch_one(self.pool)
        .await?;

        Ok(granted)
    }
}
