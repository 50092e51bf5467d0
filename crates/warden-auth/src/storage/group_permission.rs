//! Group-permission grant storage trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// Grant of a permission to every member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPermission {
    pub group_id: String,
    pub permission_id: String,
}

impl GroupPermission {
    #[must_use]
    pub fn new(group_id: impl Into<String>, permission_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            permission_id: permission_id.into(),
        }
    }
}

/// Storage operations for grants.
#[async_trait]
pub trait GroupPermissionStorage: Send + Sync {
    /// Inserts a grant. Fails with a conflict if the pair exists.
    async fn create(&self, grant: &GroupPermission) -> AuthResult<()>;

    async fn find(&self, group_id: &str, permission_id: &str)
    -> AuthResult<Option<GroupPermission>>;

    /// Removes a grant. Returns `false` if it did not exist.
    async fn delete(&self, group_id: &str, permission_id: &str) -> AuthResult<bool>;
}
