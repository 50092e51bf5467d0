//! Cache-aside repository for memberships and per-group permission checks.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, instrument};

use crate::AuthResult;
use crate::access::MembershipSource;
use crate::cache::{CacheAside, keys};
use crate::storage::{UserGroup, UserGroupStorage};

/// Memberships with read-through caching by pair and by user.
///
/// Permission checks are cached in one hash bucket per group with a field per
/// permission name, so checks of different names against the same group share
/// a single expiry.
#[derive(Clone)]
pub struct UserGroupRepository {
    storage: Arc<dyn UserGroupStorage>,
    cache: CacheAside,
}

impl UserGroupRepository {
    #[must_use]
    pub fn new(storage: Arc<dyn UserGroupStorage>, cache: CacheAside) -> Self {
        Self { storage, cache }
    }

    fn stale_keys(user_id: &str, group_id: &str) -> Vec<String> {
        vec![
            keys::user_groups_of(user_id),
            keys::user_group(user_id, group_id),
        ]
    }

    #[instrument(skip(self, membership), fields(user_id = %membership.user_id, group_id = %membership.group_id))]
    pub async fn create(&self, membership: &UserGroup) -> AuthResult<()> {
        self.storage.create(membership).await?;
        self.cache
            .invalidate(&Self::stale_keys(&membership.user_id, &membership.group_id))
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find(&self, user_id: &str, group_id: &str) -> AuthResult<Option<UserGroup>> {
        self.cache
            .read_through(&keys::user_group(user_id, group_id), || {
                self.storage.find(user_id, group_id)
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn find_by_user_id(&self, user_id: &str) -> AuthResult<Vec<UserGroup>> {
        let memberships = self
            .cache
            .read_through(&keys::user_groups_of(user_id), || async {
                self.storage.find_by_user_id(user_id).await.map(Some)
            })
            .await?;
        Ok(memberships.unwrap_or_default())
    }

    /// Removes a membership. Returns `false` if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str, group_id: &str) -> AuthResult<bool> {
        let removed = self.storage.delete(user_id, group_id).await?;
        self.cache
            .invalidate(&Self::stale_keys(user_id, group_id))
            .await;
        Ok(removed)
    }

    /// Whether the group is granted the named permission.
    #[instrument(skip(self))]
    pub async fn has_permission(&self, group_id: &str, permission_name: &str) -> AuthResult<bool> {
        let bucket = keys::group_permission_bucket(group_id);
        if let Some(granted) = self
            .cache
            .lookup_field::<bool>(&bucket, permission_name)
            .await
        {
            return Ok(granted);
        }

        let granted = self
            .storage
            .group_has_permission(group_id, permission_name)
            .await
            .inspect_err(|e| {
                error!(key = %bucket, field = %permission_name, error = %e, "permission lookup failed");
            })?;
        self.cache
            .remember_field(&bucket, permission_name, &granted)
            .await;
        Ok(granted)
    }
}

#[async_trait]
impl MembershipSource for UserGroupRepository {
    async fn groups_of(&self, user_id: &str) -> AuthResult<Vec<UserGroup>> {
        self.find_by_user_id(user_id).await
    }

    async fn group_has_permission(&self, group_id: &str, permission: &str) -> AuthResult<bool> {
        self.has_permission(group_id, permission).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCache;
    use crate::storage::{
        Group, GroupPermission, GroupPermissionStorage, GroupStorage, MemoryStorage, Permission,
        PermissionStorage, RegistrationStorage, RegistrationTransaction, User,
    };
    use std::time::Duration;

    async fn seed_user(storage: &MemoryStorage, username: &str) -> User {
        let user = User::new(username, username, format!("{username}@example.com"), "hash");
        let mut tx = storage.begin().await.unwrap();
        tx.insert_user(&user).await.unwrap();
        tx.commit().await.unwrap();
        user
    }

    fn setup() -> (UserGroupRepository, MemoryStorage, LocalCache) {
        let storage = MemoryStorage::new();
        let local = LocalCache::new();
        let cache = CacheAside::new(Arc::new(local.clone()), Duration::from_secs(60));
        (
            UserGroupRepository::new(Arc::new(storage.clone()), cache),
            storage,
            local,
        )
    }

    #[tokio::test]
    async fn test_membership_list_is_invalidated_on_write() {
        let (repo, storage, _) = setup();
        let user = seed_user(&storage, "alice").await;
        let g1 = Group::new("G1");
        let g2 = Group::new("G2");
        GroupStorage::create(&storage, &g1).await.unwrap();
        GroupStorage::create(&storage, &g2).await.unwrap();

        assert!(repo.find_by_user_id(&user.id).await.unwrap().is_empty());

        repo.create(&UserGroup::new(&user.id, &g1.id)).await.unwrap();
        repo.create(&UserGroup::new(&user.id, &g2.id)).await.unwrap();
        assert_eq!(repo.find_by_user_id(&user.id).await.unwrap().len(), 2);
        assert!(repo.find(&user.id, &g1.id).await.unwrap().is_some());

        assert!(repo.delete(&user.id, &g1.id).await.unwrap());
        assert_eq!(
            repo.find_by_user_id(&user.id).await.unwrap(),
            vec![UserGroup::new(&user.id, &g2.id)]
        );
        assert_eq!(repo.find(&user.id, &g1.id).await.unwrap(), None);
        assert!(!repo.delete(&user.id, &g1.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_has_permission_caches_per_field() {
        let (repo, storage, local) = setup();
        let group = Group::new("G1");
        let permission = Permission::new("REPORT_READ");
        GroupStorage::create(&storage, &group).await.unwrap();
        PermissionStorage::create(&storage, &permission).await.unwrap();
        GroupPermissionStorage::create(&storage, &GroupPermission::new(&group.id, &permission.id))
            .await
            .unwrap();

        assert!(repo.has_permission(&group.id, "REPORT_READ").await.unwrap());
        assert!(!repo.has_permission(&group.id, "REPORT_DELETE").await.unwrap());

        let calls = storage.calls();
        assert!(repo.has_permission(&group.id, "REPORT_READ").await.unwrap());
        assert!(!repo.has_permission(&group.id, "REPORT_DELETE").await.unwrap());
        assert_eq!(storage.calls(), calls);

        let bucket = keys::group_permission_bucket(&group.id);
        assert!(local.ttl(&bucket).is_some());
    }
}
