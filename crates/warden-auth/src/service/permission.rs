//! Permission administration.

use tracing::{info, instrument};

use crate::access::AccessResolver;
use crate::constants::{
    FULL_ACCESS, PERMISSION_ALL, PERMISSION_CREATE, PERMISSION_DELETE, PERMISSION_READ,
    PERMISSION_UPDATE,
};
use crate::error::Entity;
use crate::repository::PermissionRepository;
use crate::storage::Permission;
use crate::{AuthError, AuthResult};

#[derive(Clone)]
pub struct PermissionService {
    access: AccessResolver,
    permissions: PermissionRepository,
}

impl PermissionService {
    #[must_use]
    pub fn new(access: AccessResolver, permissions: PermissionRepository) -> Self {
        Self {
            access,
            permissions,
        }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, actor: &str, name: &str) -> AuthResult<Permission> {
        self.access
            .has_access(actor, &[FULL_ACCESS, PERMISSION_ALL, PERMISSION_CREATE])
            .await?;

        if self.permissions.find_by_name(name).await?.is_some() {
            return Err(AuthError::already_exists(Entity::Permission));
        }

        let permission = Permission::new(name);
        self.permissions.create(&permission).await?;
        info!(permission_id = %permission.id, "permission created");
        Ok(permission)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, actor: &str, id: &str) -> AuthResult<Permission> {
        self.access
            .has_access(actor, &[FULL_ACCESS, PERMISSION_ALL, PERMISSION_READ])
            .await?;
        self.permissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found(Entity::Permission))
    }

    #[instrument(skip(self))]
    pub async fn find_by_name(&self, actor: &str, name: &str) -> AuthResult<Permission> {
        self.access
            .has_access(actor, &[FULL_ACCESS, PERMISSION_ALL, PERMISSION_READ])
            .await?;
        self.permissions
            .find_by_name(name)
            .await?
            .ok_or_else(|| AuthError::not_found(Entity::Permission))
    }

    /// Renames a permission. Cached grant checks of every group holding it
    /// are dropped.
    #[instrument(skip(self))]
    pub async fn update(&self, actor: &str, id: &str, name: &str) -> AuthResult<Permission> {
        self.access
            .has_access(actor, &[FULL_ACCESS, PERMISSION_ALL, PERMISSION_UPDATE])
            .await?;

        let renamed = Permission {
            id: id.to_string(),
            name: name.to_string(),
        };
        match self.permissions.update(&renamed).await? {
            Some(_) => Ok(renamed),
            None => Err(AuthError::not_found(Entity::Permission)),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &str, id: &str) -> AuthResult<()> {
        self.access
            .has_access(actor, &[FULL_ACCESS, PERMISSION_ALL, PERMISSION_DELETE])
            .await?;

        self.permissions
            .delete_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found(Entity::Permission))?;
        info!(permission_id = %id, "permission deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SYSTEM_PRINCIPAL;
    use crate::service::testing::harness;

    #[tokio::test]
    async fn test_crud_as_admin() {
        let h = harness().await;
        let service = PermissionService::new(h.access.clone(), h.permissions.clone());
        let admin = h.admin.id.as_str();

        let created = service.create(admin, "REPORT_READ").await.unwrap();
        assert_eq!(
            service.find_by_name(admin, "REPORT_READ").await.unwrap(),
            created
        );

        let renamed = service
            .update(admin, &created.id, "REPORT_VIEW")
            .await
            .unwrap();
        assert_eq!(service.find_by_id(admin, &created.id).await.unwrap(), renamed);

        service.delete(admin, &created.id).await.unwrap();
        assert!(
            service
                .find_by_id(admin, &created.id)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_duplicate_and_missing() {
        let h = harness().await;
        let service = PermissionService::new(h.access.clone(), h.permissions.clone());

        service.create(SYSTEM_PRINCIPAL, "REPORT_READ").await.unwrap();
        assert!(
            service
                .create(SYSTEM_PRINCIPAL, "REPORT_READ")
                .await
                .unwrap_err()
                .is_conflict()
        );
        assert!(
            service
                .delete(SYSTEM_PRINCIPAL, "missing")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_outsider_is_denied() {
        let h = harness().await;
        let service = PermissionService::new(h.access.clone(), h.permissions.clone());

        let err = service
            .create(&h.outsider.id, "REPORT_READ")
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
