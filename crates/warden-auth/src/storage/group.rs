//! Group storage trait.
//!
//! Defines the interface for group persistence operations.
//! Implementations are provided by storage backends (e.g., PostgreSQL).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// A named set of principals. Root of the authorization graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier for the group.
    pub id: String,

    /// Unique group name (e.g., "DEFAULT", "SUPER_USER").
    pub name: String,
}

impl Group {
    /// Creates a group with a freshly generated id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// Storage operations for groups.
#[async_trait]
pub trait GroupStorage: Send + Sync {
    /// Inserts a group. Fails with a conflict if the name is taken.
    async fn create(&self, group: &Group) -> AuthResult<()>;

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<Group>>;

    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Group>>;

    /// Renames a group. Returns the row as it was before the write, or `None`
    /// if no group has that id.
    async fn update(&self, group: &Group) -> AuthResult<Option<Group>>;

    /// Deletes a group and its memberships and grants. Returns the deleted
    /// row, or `None` if it did not exist.
    async fn delete_by_id(&self, id: &str) -> AuthResult<Option<Group>>;
}
