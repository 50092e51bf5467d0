//! Cache-aside repository for permissions.

use std::sync::Arc;

use tracing::instrument;

use crate::AuthResult;
use crate::cache::{CacheAside, keys};
use crate::storage::{Permission, PermissionStorage};

/// Permissions with read-through caching by id and by name.
///
/// Renaming or deleting a permission also drops the permission-check bucket
/// and the grant entry of every group holding it. Buckets are keyed by name.
#[derive(Clone)]
pub struct PermissionRepository {
    storage: Arc<dyn PermissionStorage>,
    cache: CacheAside,
}

impl PermissionRepository {
    #[must_use]
    pub fn new(storage: Arc<dyn PermissionStorage>, cache: CacheAside) -> Self {
        Self { storage, cache }
    }

    fn stale_keys(permission: &Permission) -> Vec<String> {
        vec![
            keys::permission_by_id(&permission.id),
            keys::permission_by_name(&permission.name),
        ]
    }

    async fn grant_keys(&self, permission_id: &str) -> AuthResult<Vec<String>> {
        Ok(self
            .storage
            .find_granting_group_ids(permission_id)
            .await?
            .iter()
            .flat_map(|group_id| {
                [
                    keys::group_permission_bucket(group_id),
                    keys::group_permission(group_id, permission_id),
                ]
            })
            .collect())
    }

    #[instrument(skip(self, permission), fields(permission_id = %permission.id, name = %permission.name))]
    pub async fn create(&self, permission: &Permission) -> AuthResult<()> {
        self.storage.create(permission).await?;
        self.cache.invalidate(&Self::stale_keys(permission)).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> AuthResult<Option<Permission>> {
        self.cache
            .read_through(&keys::permission_by_id(id), || self.storage.find_by_id(id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> AuthResult<Option<Permission>> {
        self.cache
            .read_through(&keys::permission_by_name(name), || {
                self.storage.find_by_name(name)
            })
            .await
    }

    /// Renames a permission. Returns the previous row, or `None` if missing.
    #[instrument(skip(self, permission), fields(permission_id = %permission.id, name = %permission.name))]
    pub async fn update(&self, permission: &Permission) -> AuthResult<Option<Permission>> {
        let mut stale = Self::stale_keys(permission);
        if let Some(current) = self.storage.find_by_id(&permission.id).await? {
            stale.push(keys::permission_by_name(&current.name));
        }
        stale.extend(self.grant_keys(&permission.id).await?);
        self.cache.invalidate(&stale).await;

        let previous = self.storage.update(permission).await?;

        if let Some(previous) = &previous {
            stale.push(keys::permission_by_name(&previous.name));
        }
        self.cache.invalidate(&stale).await;
        Ok(previous)
    }

    /// Deletes a permission. Returns the deleted row, or `None` if missing.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: &str) -> AuthResult<Option<Permission>> {
        // Grants cascade with the row, so collect the buckets first.
        let mut stale = self.grant_keys(id).await?;
        stale.push(keys::permission_by_id(id));

        let deleted = self.storage.delete_by_id(id).await?;

        if let Some(permission) = &deleted {
            stale.push(keys::permission_by_name(&permission.name));
        }
        self.cache.invalidate(&stale).await;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCache;
    use crate::repository::UserGroupRepository;
    use crate::storage::{
        Group, GroupPermission, GroupPermissionStorage, GroupStorage, MemoryStorage,
    };
    use std::time::Duration;

    struct Fixture {
        permissions: PermissionRepository,
        memberships: UserGroupRepository,
        storage: MemoryStorage,
    }

    fn setup() -> Fixture {
        let storage = MemoryStorage::new();
        let cache = CacheAside::new(Arc::new(LocalCache::new()), Duration::from_secs(60));
        Fixture {
            permissions: PermissionRepository::new(Arc::new(storage.clone()), cache.clone()),
            memberships: UserGroupRepository::new(Arc::new(storage.clone()), cache),
            storage,
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let fx = setup();
        let permission = Permission::new("REPORT_READ");
        fx.permissions.create(&permission).await.unwrap();

        for _ in 0..2 {
            assert_eq!(
                fx.permissions.find_by_id(&permission.id).await.unwrap(),
                Some(permission.clone())
            );
            assert_eq!(
                fx.permissions.find_by_name("REPORT_READ").await.unwrap(),
                Some(permission.clone())
            );
        }
    }

    #[tokio::test]
    async fn test_delete_drops_group_buckets() {
        let fx = setup();
        let group = Group::new("G1");
        let permission = Permission::new("REPORT_READ");
        GroupStorage::create(&fx.storage, &group).await.unwrap();
        fx.permissions.create(&permission).await.unwrap();
        GroupPermissionStorage::create(
            &fx.storage,
            &GroupPermission::new(&group.id, &permission.id),
        )
        .await
        .unwrap();

        assert!(
            fx.memberships
                .has_permission(&group.id, "REPORT_READ")
                .await
                .unwrap()
        );

        fx.permissions.delete_by_id(&permission.id).await.unwrap();

        assert!(
            !fx.memberships
                .has_permission(&group.id, "REPORT_READ")
                .await
                .unwrap()
        );
        assert_eq!(fx.permissions.find_by_name("REPORT_READ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rename_drops_group_buckets() {
        let fx = setup();
        let group = Group::new("G1");
        let permission = Permission::new("REPORT_READ");
        GroupStorage::create(&fx.storage, &group).await.unwrap();
        fx.permissions.create(&permission).await.unwrap();
        GroupPermissionStorage::create(
            &fx.storage,
            &GroupPermission::new(&group.id, &permission.id),
        )
        .await
        .unwrap();
        assert!(
            fx.memberships
                .has_permission(&group.id, "REPORT_READ")
                .await
                .unwrap()
        );

        let renamed = Permission {
            id: permission.id.clone(),
            name: "REPORT_VIEW".to_string(),
        };
        fx.permissions.update(&renamed).await.unwrap();

        assert!(
            !fx.memberships
                .has_permission(&group.id, "REPORT_READ")
                .await
                .unwrap()
        );
        assert!(
            fx.memberships
                .has_permission(&group.id, "REPORT_VIEW")
                .await
                .unwrap()
        );
    }
}
