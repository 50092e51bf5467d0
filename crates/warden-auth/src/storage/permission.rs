//! Permission storage trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// A named capability (e.g. `GROUP_CREATE`) granted to groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Unique identifier for the permission.
    pub id: String,

    /// Unique capability name.
    pub name: String,
}

impl Permission {
    /// Creates a permission with a freshly generated id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// Storage operations for permissions.
#[async_trait]
pub trait PermissionStorage: Send + Sync {
    /// Inserts a permission. Fails with a conflict if the name is taken.
    async fn create(&self, permission: &Permission) -> AuthResult<()>;

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<Permission>>;

    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Permission>>;

    /// Renames a permission. Returns the previous row, or `None` if missing.
    async fn update(&self, permission: &Permission) -> AuthResult<Option<Permission>>;

    /// Deletes a permission and its grants. Returns the deleted row.
    async fn delete_by_id(&self, id: &str) -> AuthResult<Option<Permission>>;

    /// Ids of the groups currently granted this permission.
    async fn find_granting_group_ids(&self, permission_id: &str) -> AuthResult<Vec<String>>;
}
