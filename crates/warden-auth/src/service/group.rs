//! Group administration.

use tracing::{info, instrument};

use crate::access::AccessResolver;
use crate::constants::{FULL_ACCESS, GROUP_ALL, GROUP_CREATE, GROUP_DELETE, GROUP_READ, GROUP_UPDATE};
use crate::error::Entity;
use crate::repository::GroupRepository;
use crate::storage::Group;
use crate::{AuthError, AuthResult};

#[derive(Clone)]
pub struct GroupService {
    access: AccessResolver,
    groups: GroupRepository,
}

impl GroupService {
    #[must_use]
    pub fn new(access: AccessResolver, groups: GroupRepository) -> Self {
        Self { access, groups }
    }

    /// Creates a group with a fresh id.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the name is taken.
    #[instrument(skip(self))]
    pub async fn create(&self, actor: &str, name: &str) -> AuthResult<Group> {
        self.access
            .has_access(actor, &[FULL_ACCESS, GROUP_ALL, GROUP_CREATE])
            .await?;

        if self.groups.find_by_name(name).await?.is_some() {
            return Err(AuthError::already_exists(Entity::Group));
        }

        let group = Group::new(name);
        self.groups.create(&group).await?;
        info!(group_id = %group.id, "group created");
        Ok(group)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, actor: &str, id: &str) -> AuthResult<Group> {
        self.access
            .has_access(actor, &[FULL_ACCESS, GROUP_ALL, GROUP_READ])
            .await?;
        self.groups
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found(Entity::Group))
    }

    #[instrument(skip(self))]
    pub async fn find_by_name(&self, actor: &str, name: &str) -> AuthResult<Group> {
        self.access
            .has_access(actor, &[FULL_ACCESS, GROUP_ALL, GROUP_READ])
            .await?;
        self.groups
            .find_by_name(name)
            .await?
            .ok_or_else(|| AuthError::not_found(Entity::Group))
    }

    /// Renames a group.
    #[instrument(skip(self))]
    pub async fn update(&self, actor: &str, id: &str, name: &str) -> AuthResult<Group> {
        self.access
            .has_access(actor, &[FULL_ACCESS, GROUP_ALL, GROUP_UPDATE])
            .await?;

        let renamed = Group {
            id: id.to_string(),
            name: name.to_string(),
        };
        match self.groups.update(&renamed).await? {
            Some(_) => Ok(renamed),
            None => Err(AuthError::not_found(Entity::Group)),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &str, id: &str) -> AuthResult<()> {
        self.access
            .has_access(actor, &[FULL_ACCESS, GROUP_ALL, GROUP_DELETE])
            .await?;

        self.groups
            .delete_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found(Entity::Group))?;
        info!(group_id = %id, "group deleted");
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
        let service = GroupService::new(h.access.clone(), h.groups.clone());
        let admin = h.admin.id.as_str();

        let created = service.create(admin, "REPORTERS").await.unwrap();
        assert_eq!(service.find_by_id(admin, &created.id).await.unwrap(), created);
        assert_eq!(
            service.find_by_name(admin, "REPORTERS").await.unwrap(),
            created
        );

        let renamed = service
            .update(admin, &created.id, "EDITORS")
            .await
            .unwrap();
        assert_eq!(renamed.name, "EDITORS");
        assert!(
            service
                .find_by_name(admin, "REPORTERS")
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert_eq!(service.find_by_id(admin, &created.id).await.unwrap(), renamed);

        service.delete(admin, &created.id).await.unwrap();
        assert!(
            service
                .find_by_id(admin, &created.id)
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            service
                .delete(admin, &created.id)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let h = harness().await;
        let service = GroupService::new(h.access.clone(), h.groups.clone());

        service.create(SYSTEM_PRINCIPAL, "REPORTERS").await.unwrap();
        let err = service
            .create(SYSTEM_PRINCIPAL, "REPORTERS")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::AlreadyExists {
                entity: Entity::Group
            }
        ));

        let other = service.create(SYSTEM_PRINCIPAL, "EDITORS").await.unwrap();
        let err = service
            .update(SYSTEM_PRINCIPAL, &other.id, "REPORTERS")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_update_missing_group() {
        let h = harness().await;
        let service = GroupService::new(h.access.clone(), h.groups.clone());

        let err = service
            .update(SYSTEM_PRINCIPAL, "missing", "ANY")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_outsider_is_denied() {
        let h = harness().await;
        let service = GroupService::new(h.access.clone(), h.groups.clone());
        let outsider = h.outsider.id.as_str();

        assert!(
            service
                .create(outsider, "REPORTERS")
                .await
                .unwrap_err()
                .is_unauthorized()
        );
        assert!(
            service
                .find_by_name(outsider, "ADMINS")
                .await
                .unwrap_err()
                .is_unauthorized()
        );
    }
}
