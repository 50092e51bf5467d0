//! Schema bootstrap.

use sqlx_core::query::query;
use tracing::{debug, instrument};

use crate::{PgPool, StorageResult};

/// DDL applied in order. Every statement is idempotent.
const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id          TEXT PRIMARY KEY,
        full_name   TEXT NOT NULL,
        username    TEXT NOT NULL UNIQUE,
        email       TEXT NOT NULL UNIQUE,
        password    TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL,
        deleted_at  TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id    TEXT PRIMARY KEY,
        name  TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS permissions (
        id    TEXT PRIMARY KEY,
        name  TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_groups (
        user_id   TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        group_id  TEXT NOT NULL REFERENCES groups (id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, group_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_permissions (
        group_id       TEXT NOT NULL REFERENCES groups (id) ON DELETE CASCADE,
        permission_id  TEXT NOT NULL REFERENCES permissions (id) ON DELETE CASCADE,
        PRIMARY KEY (group_id, permission_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS group_permissions_permission_id_idx
        ON group_permissions (permission_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS user_groups_group_id_idx
        ON user_groups (group_id)
    "#,
];

/// Creates every table and index that does not exist yet.
///
/// # Errors
///
/// Returns an error if a statement fails.
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> StorageResult<()> {
    for statement in STATEMENTS {
        query(statement).execute(pool).await?;
    }
    debug!(statements = STATEMENTS.len(), "schema ensured");
    Ok(())
}
