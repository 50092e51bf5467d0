//! User-group membership storage trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// Membership of a user in a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    pub user_id: String,
    pub group_id: String,
}

impl UserGroup {
    #[must_use]
    pub fn new(user_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: group_id.into(),
        }
    }
}

/// Storage operations for memberships.
#[async_trait]
pub trait UserGroupStorage: Send + Sync {
    /// Inserts a membership. Fails with a conflict if the pair exists.
    async fn create(&self, membership: &UserGroup) -> AuthResult<()>;

    async fn find(&self, user_id: &str, group_id: &str) -> AuthResult<Option<UserGroup>>;

    async fn find_by_user_id(&self, user_id: &str) -> AuthResult<Vec<UserGroup>>;

    /// Removes a membership. Returns `false` if it did not exist.
    async fn delete(&self, user_id: &str, group_id: &str) -> AuthResult<bool>;

    /// Whether the group is granted the named permission
    /// (group → group-permission → permission).
    async fn group_has_permission(&self, group_id: &str, permission_name: &str)
    -> AuthResult<bool>;
}
