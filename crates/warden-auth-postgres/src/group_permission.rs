//! Permission grant storage.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tracing::instrument;
use warden_auth::storage::GroupPermission;

use crate::{PgPool, StorageError, StorageResult};

/// Grant storage operations.
pub struct GroupPermissionStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupPermissionStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, grant), fields(group_id = %grant.group_id, permission_id = %grant.permission_id))]
    pub async fn create(&self, grant: &GroupPermission) -> StorageResult<()> {
        query("INSERT INTO group_permissions (group_id, permission_id) VALUES ($1, $2)")
            .bind(&grant.group_id)
            .bind(&grant.permission_id)
            .execute(self.pool)
            .await
            .map_err(StorageError::from_write)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find(
        &self,
        group_id: &str,
        permission_id: &str,
    ) -> StorageResult<Option<GroupPermission>> {
        let row: Option<(String, String)> = query_as(
            r#"
            SELECT group_id, permission_id
            FROM group_permissions
            WHERE group_id = $1 AND permission_id = $2
            "#,
        )
        .bind(group_id)
        .bind(permission_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(group_id, permission_id)| GroupPermission {
            group_id,
            permission_id,
        }))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, group_id: &str, permission_id: &str) -> StorageResult<bool> {
        let result =
            query("DELETE FROM group_permissions WHERE group_id = $1 AND permission_id = $2")
                .bind(group_id)
                .bind(permission_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
