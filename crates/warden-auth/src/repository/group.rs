//! Cache-aside repository for groups.

use std::sync::Arc;

use tracing::instrument;

use crate::AuthResult;
use crate::cache::{CacheAside, keys};
use crate::storage::{Group, GroupStorage};

/// Groups with read-through caching by id and by name.
#[derive(Clone)]
pub struct GroupRepository {
    storage: Arc<dyn GroupStorage>,
    cache: CacheAside,
}

impl GroupRepository {
    #[must_use]
    pub fn new(storage: Arc<dyn GroupStorage>, cache: CacheAside) -> Self {
        Self { storage, cache }
    }

    /// Keys that can hold a stale view of this group.
    fn stale_keys(group: &Group) -> Vec<String> {
        vec![keys::group_by_id(&group.id), keys::group_by_name(&group.name)]
    }

    #[instrument(skip(self, group), fields(group_id = %group.id, name = %group.name))]
    pub async fn create(&self, group: &Group) -> AuthResult<()> {
        self.storage.create(group).await?;
        // Drops not-found markers cached before the row existed.
        self.cache.invalidate(&Self::stale_keys(group)).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> AuthResult<Option<Group>> {
        self.cache
            .read_through(&keys::group_by_id(id), || self.storage.find_by_id(id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> AuthResult<Option<Group>> {
        self.cache
            .read_through(&keys::group_by_name(name), || {
                self.storage.find_by_name(name)
            })
            .await
    }

    /// Renames a group. Returns the previous row, or `None` if it is missing.
    #[instrument(skip(self, group), fields(group_id = %group.id, name = %group.name))]
    pub async fn update(&self, group: &Group) -> AuthResult<Option<Group>> {
        let mut stale = Self::stale_keys(group);
        if let Some(current) = self.storage.find_by_id(&group.id).await? {
            stale.push(keys::group_by_name(&current.name));
        }
        self.cache.invalidate(&stale).await;

        let previous = self.storage.update(group).await?;

        if let Some(previous) = &previous {
            stale.push(keys::group_by_name(&previous.name));
        }
        self.cache.invalidate(&stale).await;
        Ok(previous)
    }

    /// Deletes a group. Returns the deleted row, or `None` if it was missing.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: &str) -> AuthResult<Option<Group>> {
        let deleted = self.storage.delete_by_id(id).await?;

        let mut stale = vec![keys::group_by_id(id), keys::group_permission_bucket(id)];
        if let Some(group) = &deleted {
            stale.push(keys::group_by_name(&group.name));
        }
        self.cache.invalidate(&stale).await;
        Ok(deleted)
    }
}
