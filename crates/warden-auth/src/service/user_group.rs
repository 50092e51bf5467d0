//! Group membership administration.

use tracing::{info, instrument};

use crate::access::AccessResolver;
use crate::constants::{FULL_ACCESS, USER_GROUP_ALL, USER_GROUP_CREATE, USER_GROUP_DELETE, USER_GROUP_READ};
use crate::error::Entity;
use crate::repository::{GroupRepository, UserGroupRepository, UserRepository};
use crate::storage::UserGroup;
use crate::{AuthError, AuthResult};

#[derive(Clone)]
pub struct UserGroupService {
    access: AccessResolver,
    memberships: UserGroupRepository,
    users: UserRepository,
    groups: GroupRepository,
}

impl UserGroupService {
    #[must_use]
    pub fn new(
        access: AccessResolver,
        memberships: UserGroupRepository,
        users: UserRepository,
        groups: GroupRepository,
    ) -> Self {
        Self {
            access,
            memberships,
            users,
            groups,
        }
    }

    /// Adds a user to a group. Both must exist.
    #[instrument(skip(self))]
    pub async fn create(&self, actor: &str, user_id: &str, group_id: &str) -> AuthResult<UserGroup> {
        self.access
            .has_access(actor, &[FULL_ACCESS, USER_GROUP_ALL, USER_GROUP_CREATE])
            .await?;

        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::not_found(Entity::User));
        }
        if self.groups.find_by_id(group_id).await?.is_none() {
            return Err(AuthError::not_found(Entity::Group));
        }
        if self.memberships.find(user_id, group_id).await?.is_some() {
            return Err(AuthError::already_exists(Entity::UserGroup));
        }

        let membership = UserGroup::new(user_id, group_id);
        self.memberships.create(&membership).await?;
        info!(user_id = %user_id, group_id = %group_id, "user added to group");
        Ok(membership)
    }

    #[instrument(skip(self))]
    pub async fn find(&self, actor: &str, user_id: &str, group_id: &str) -> AuthResult<UserGroup> {
        self.access
            .has_access(actor, &[FULL_ACCESS, USER_GROUP_ALL, USER_GROUP_READ])
            .await?;
        self.memberships
            .find(user_id, group_id)
            .await?
            .ok_or_else(|| AuthError::not_found(Entity::UserGroup))
    }

    #[instrument(skip(self))]
    pub async fn find_by_user_id(&self, actor: &str, user_id: &str) -> AuthResult<Vec<UserGroup>> {
        self.access
            .has_access(actor, &[FULL_ACCESS, USER_GROUP_ALL, USER_GROUP_READ])
            .await?;
        self.memberships.find_by_user_id(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &str, user_id: &str, group_id: &str) -> AuthResult<()> {
        self.access
            .has_access(actor, &[FULL_ACCESS, USER_GROUP_ALL, USER_GROUP_DELETE])
            .await?;

        if !self.memberships.delete(user_id, group_id).await? {
            return Err(AuthError::not_found(Entity::UserGroup));
        }
        info!(user_id = %user_id, group_id = %group_id, "user removed from group");
        Ok(())
    }
}
