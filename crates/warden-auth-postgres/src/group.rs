//! Group storage.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tracing::instrument;
use warden_auth::storage::Group;

use crate::{PgPool, StorageError, StorageResult};

type GroupRow = (String, String);

fn from_row((id, name): GroupRow) -> Group {
    Group { id, name }
}

/// Group storage operations.
pub struct GroupStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupStorage<'a> {
    /// Create a new group storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a group.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the id or name is taken.
    #[instrument(skip(self, group), fields(group_id = %group.id))]
    pub async fn create(&self, group: &Group) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO groups (id, name)
            VALUES ($1, $2)
            "#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .execute(self.pool)
        .await
        .map_err(StorageError::from_write)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> StorageResult<Option<Group>> {
        let row: Option<GroupRow> = query_as(
            r#"
            SELECT id, name
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> StorageResult<Option<Group>> {
        let row: Option<GroupRow> = query_as(
            r#"
            SELECT id, name
            FROM groups
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    /// Rename a group, returning the row as it was before the update.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the new name is taken.
    #[instrument(skip(self, group), fields(group_id = %group.id))]
    pub async fn update(&self, group: &Group) -> StorageResult<Option<Group>> {
        let row: Option<GroupRow> = query_as(
            r#"
            WITH previous AS (
                SELECT id, name FROM groups WHERE id = $1 FOR UPDATE
            )
            UPDATE groups
            SET name = $2
            FROM previous
            WHERE groups.id = previous.id
            RETURNING previous.id, previous.name
            "#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .fetch_optional(self.pool)
        .await
        .map_err(StorageError::from_write)?;

        Ok(row.map(from_row))
    }

    /// Delete a group, returning the deleted row.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: &str) -> StorageResult<Option<Group>> {
        let row: Option<GroupRow> = query_as(
            r#"
            DELETE FROM groups
            WHERE id = $1
            RETURNING id, name
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(from_row))
    }
}
