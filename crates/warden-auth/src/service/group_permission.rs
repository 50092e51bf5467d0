//! Permission grants to groups.

use tracing::{info, instrument};

use crate::access::AccessResolver;
use crate::constants::{
    FULL_ACCESS, GROUP_PERMISSION_ALL, GROUP_PERMISSION_CREATE, GROUP_PERMISSION_DELETE,
    GROUP_PERMISSION_READ,
};
use crate::error::Entity;
use crate::repository::{GroupPermissionRepository, GroupRepository, PermissionRepository};
use crate::storage::GroupPermission;
use crate::{AuthError, AuthResult};

#[derive(Clone)]
pub struct GroupPermissionService {
    access: AccessResolver,
    grants: GroupPermissionRepository,
    groups: GroupRepository,
    permissions: PermissionRepository,
}

impl GroupPermissionService {
    #[must_use]
    pub fn new(
        access: AccessResolver,
        grants: GroupPermissionRepository,
        groups: GroupRepository,
        permissions: PermissionRepository,
    ) -> Self {
        Self {
            access,
            grants,
            groups,
            permissions,
        }
    }

    /// Grants a permission to a group. Both must exist.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the grant is present already, including when a
    /// concurrent caller won the race to the unique constraint.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        actor: &str,
        group_id: &str,
        permission_id: &str,
    ) -> AuthResult<GroupPermission> {
        self.access
            .has_access(actor, &[FULL_ACCESS, GROUP_PERMISSION_ALL, GROUP_PERMISSION_CREATE])
            .await?;

        if self.groups.find_by_id(group_id).await?.is_none() {
            return Err(AuthError::not_found(Entity::Group));
        }
        if self.permissions.find_by_id(permission_id).await?.is_none() {
            return Err(AuthError::not_found(Entity::Permission));
        }
        if self.grants.find(group_id, permission_id).await?.is_some() {
            return Err(AuthError::already_exists(Entity::GroupPermission));
        }

        let grant = GroupPermission::new(group_id, permission_id);
        self.grants.create(&grant).await?;
        info!(group_id = %group_id, permission_id = %permission_id, "permission granted");
        Ok(grant)
    }

    #[instrument(skip(self))]
    pub async fn find(
        &self,
        actor: &str,
        group_id: &str,
        permission_id: &str,
    ) -> AuthResult<GroupPermission> {
        self.access
            .has_access(actor, &[FULL_ACCESS, GROUP_PERMISSION_ALL, GROUP_PERMISSION_READ])
            .await?;
        self.grants
            .find(group_id, permission_id)
            .await?
            .ok_or_else(|| AuthError::not_found(Entity::GroupPermission))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &str, group_id: &str, permission_id: &str) -> AuthResult<()> {
        self.access
            .has_access(actor, &[FULL_ACCESS, GROUP_PERMISSION_ALL, GROUP_PERMISSION_DELETE])
            .await?;

        if !self.grants.delete(group_id, permission_id).await? {
            return Err(AuthError::not_found(Entity::GroupPermission));
        }
        info!(group_id = %group_id, permission_id = %permission_id, "permission revoked");
        Ok(())
    }
}
