//! Permission storage.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tracing::instrument;
use warden_auth::storage::Permission;

use crate::{PgPool, StorageError, StorageResult};

type PermissionRow = (String, String);

fn from_row((id, name): PermissionRow) -> Permission {
    Permission { id, name }
}

/// Permission storage operations.
pub struct PermissionStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> PermissionStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, permission), fields(permission_id = %permission.id))]
    pub async fn create(&self, permission: &Permission) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO permissions (id, name)
            VALUES ($1, $2)
            "#,
        )
        .bind(&permission.id)
        .bind(&permission.name)
        .execute(self.pool)
        .await
        .map_err(StorageError::from_write)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> StorageResult<Option<Permission>> {
        let row: Option<PermissionRow> =
            query_as("SELECT id, name FROM permissions WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(from_row))
    }

    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> StorageResult<Option<Permission>> {
        let row: Option<PermissionRow> =
            query_as("SELECT id, name FROM permissions WHERE name = $1")
                .bind(name)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(from_row))
    }

    /// Rename a permission, returning the row as it was before the update.
    #[instrument(skip(self, permission), fields(permission_id = %permission.id))]
    pub async fn update(&self, permission: &Permission) -> StorageResult<Option<Permission>> {
        let row: Option<PermissionRow> = query_as(
            r#"
            WITH previous AS (
                SELECT id, name FROM permissions WHERE id = $1 FOR UPDATE
            )
            UPDATE permissions
            SET name = $2
            FROM previous
            WHERE permissions.id = previous.id
            RETURNING previous.id, previous.name
            "#,
        )
        .bind(&permission.id)
        .bind(&permission.name)
        .fetch_optional(self.pool)
        .await
        .map_err(StorageError::from_write)?;

        Ok(row.map(from_row))
    }

    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: &str) -> StorageResult<Option<Permission>> {
        let row: Option<PermissionRow> =
            query_as("DELETE FROM permissions WHERE id = $1 RETURNING id, name")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(from_row))
    }

    /// Ids of every group currently granted the permission.
    #[instrument(skip(self))]
    pub async fn find_granting_group_ids(&self, permission_id: &str) -> StorageResult<Vec<String>> {
        let rows: Vec<(String,)> = query_as(
            r#"
            SELECT group_id
            FROM group_permissions
            WHERE permission_id = $1
            "#,
        )
        .bind(permission_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
