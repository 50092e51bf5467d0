//! Cache-aside repository for group-permission grants.

use std::sync::Arc;

use tracing::instrument;

use crate::AuthResult;
use crate::cache::{CacheAside, keys};
use crate::storage::{GroupPermission, GroupPermissionStorage};

/// Grants with read-through caching by pair.
///
/// Writes also drop the group's permission-check bucket so the next access
/// decision sees the new grant set.
///
/// Deletes drop the bucket before and after the storage write. A permission
/// check that read storage before the delete and writes its answer after the
/// second drop can still cache a stale `true`. That entry lives at most the
/// cache TTL, because buckets never have their expiry extended.
#[derive(Clone)]
pub struct GroupPermissionRepository {
    storage: Arc<dyn GroupPermissionStorage>,
    cache: CacheAside,
}

impl GroupPermissionRepository {
    #[must_use]
    pub fn new(storage: Arc<dyn GroupPermissionStorage>, cache: CacheAside) -> Self {
        Self { storage, cache }
    }

    fn stale_keys(group_id: &str, permission_id: &str) -> Vec<String> {
        vec![
            keys::group_permission(group_id, permission_id),
            keys::group_permission_bucket(group_id),
        ]
    }

    #[instrument(skip(self, grant), fields(group_id = %grant.group_id, permission_id = %grant.permission_id))]
    pub async fn create(&self, grant: &GroupPermission) -> AuthResult<()> {
        self.storage.create(grant).await?;
        self.cache
            .invalidate(&Self::stale_keys(&grant.group_id, &grant.permission_id))
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find(
        &self,
        group_id: &str,
        permission_id: &str,
    ) -> AuthResult<Option<GroupPermission>> {
        self.cache
            .read_through(&keys::group_permission(group_id, permission_id), || {
                self.storage.find(group_id, permission_id)
            })
            .await
    }

    /// Removes a grant. Returns `false` if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, group_id: &str, permission_id: &str) -> AuthResult<bool> {
        self.cache
            .invalidate(&Self::stale_keys(group_id, permission_id))
            .await;
        let removed = self.storage.delete(group_id, permission_id).await?;
        self.cache
            .invalidate(&Self::stale_keys(group_id, permission_id))
            .await;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCache;
    use crate::repository::UserGroupRepository;
    use crate::storage::{Group, GroupStorage, MemoryStorage, Permission, PermissionStorage};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Caches a `true` answer for the group while the delete is in flight,
    /// the way a permission check that read storage just before would.
    struct LateReaderStorage {
        inner: MemoryStorage,
        cache: CacheAside,
        permission_name: String,
    }

    #[async_trait]
    impl GroupPermissionStorage for LateReaderStorage {
        async fn create(&self, grant: &GroupPermission) -> AuthResult<()> {
            GroupPermissionStorage::create(&self.inner, grant).await
        }

        async fn find(
            &self,
            group_id: &str,
            permission_id: &str,
        ) -> AuthResult<Option<GroupPermission>> {
            GroupPermissionStorage::find(&self.inner, group_id, permission_id).await
        }

        async fn delete(&self, group_id: &str, permission_id: &str) -> AuthResult<bool> {
            self.cache
                .remember_field(
                    &keys::group_permission_bucket(group_id),
                    &self.permission_name,
                    &true,
                )
                .await;
            GroupPermissionStorage::delete(&self.inner, group_id, permission_id).await
        }
    }

    #[tokio::test]
    async fn test_grant_and_revoke_reach_permission_checks() {
        let storage = MemoryStorage::new();
        let cache = CacheAside::new(Arc::new(LocalCache::new()), Duration::from_secs(60));
        let grants = GroupPermissionRepository::new(Arc::new(storage.clone()), cache.clone());
        let memberships = UserGroupRepository::new(Arc::new(storage.clone()), cache);

        let group = Group::new("G1");
        let permission = Permission::new("REPORT_READ");
        GroupStorage::create(&storage, &group).await.unwrap();
        PermissionStorage::create(&storage, &permission).await.unwrap();

        assert_eq!(grants.find(&group.id, &permission.id).await.unwrap(), None);
        assert!(!memberships.has_permission(&group.id, "REPORT_READ").await.unwrap());

        let grant = GroupPermission::new(&group.id, &permission.id);
        grants.create(&grant).await.unwrap();
        assert_eq!(
            grants.find(&group.id, &permission.id).await.unwrap(),
            Some(grant.clone())
        );
        assert!(memberships.has_permission(&group.id, "REPORT_READ").await.unwrap());

        assert!(grants.create(&grant).await.unwrap_err().is_conflict());

        assert!(grants.delete(&group.id, &permission.id).await.unwrap());
        assert_eq!(grants.find(&group.id, &permission.id).await.unwrap(), None);
        assert!(!memberships.has_permission(&group.id, "REPORT_READ").await.unwrap());
    }

    #[tokio::test]
    async fn test_answer_cached_during_delete_is_dropped() {
        let storage = MemoryStorage::new();
        let cache = CacheAside::new(Arc::new(LocalCache::new()), Duration::from_secs(60));
        let grants = GroupPermissionRepository::new(
            Arc::new(LateReaderStorage {
                inner: storage.clone(),
                cache: cache.clone(),
                permission_name: "REPORT_READ".to_string(),
            }),
            cache.clone(),
        );
        let memberships = UserGroupRepository::new(Arc::new(storage.clone()), cache);

        let group = Group::new("G1");
        let permission = Permission::new("REPORT_READ");
        GroupStorage::create(&storage, &group).await.unwrap();
        PermissionStorage::create(&storage, &permission).await.unwrap();
        grants
            .create(&GroupPermission::new(&group.id, &permission.id))
            .await
            .unwrap();

        assert!(grants.delete(&group.id, &permission.id).await.unwrap());
        assert!(!memberships.has_permission(&group.id, "REPORT_READ").await.unwrap());
    }
}
