//! In-memory implementation of every storage trait.
//!
//! Enforces the same unique and referential constraints as the relational
//! schema. Used for local development and tests; all data is lost when the
//! process exits.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{
    Group, GroupPermission, GroupPermissionStorage, GroupStorage, Permission, PermissionStorage,
    RegistrationStorage, RegistrationTransaction, User, UserGroup, UserGroupStorage, UserStorage,
};
use crate::error::Entity;
use crate::{AuthError, AuthResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<String, User>,
    groups: HashMap<String, Group>,
    permissions: HashMap<String, Permission>,
    /// (user_id, group_id)
    user_groups: BTreeSet<(String, String)>,
    /// (group_id, permission_id)
    group_permissions: BTreeSet<(String, String)>,
}

impl Tables {
    fn user_where(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.users.values().find(|u| pred(u)).cloned()
    }

    fn insert_user(&mut self, user: &User) -> AuthResult<()> {
        if self
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
            || self.users.contains_key(&user.id)
        {
            return Err(AuthError::IdentityTaken);
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn insert_user_group(&mut self, membership: &UserGroup) -> AuthResult<()> {
        if !self.users.contains_key(&membership.user_id)
            || !self.groups.contains_key(&membership.group_id)
        {
            return Err(AuthError::storage(
                "user_groups references a missing user or group",
            ));
        }
        let inserted = self
            .user_groups
            .insert((membership.user_id.clone(), membership.group_id.clone()));
        if !inserted {
            return Err(AuthError::already_exists(Entity::UserGroup));
        }
        Ok(())
    }
}

/// Shared in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
    calls: Arc<AtomicUsize>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of storage operations served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn read(&self) -> AuthResult<RwLockReadGuard<'_, Tables>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .read()
            .map_err(|_| AuthError::internal("memory storage lock poisoned"))
    }

    fn write(&self) -> AuthResult<RwLockWriteGuard<'_, Tables>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .write()
            .map_err(|_| AuthError::internal("memory storage lock poisoned"))
    }
}

// =============================================================================
// Groups
// =============================================================================

#[async_trait]
impl GroupStorage for MemoryStorage {
    async fn create(&self, group: &Group) -> AuthResult<()> {
        let mut tables = self.write()?;
        if tables.groups.contains_key(&group.id)
            || tables.groups.values().any(|g| g.name == group.name)
        {
            return Err(AuthError::already_exists(Entity::Group));
        }
        tables.groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<Group>> {
        Ok(self.read()?.groups.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Group>> {
        Ok(self
            .read()?
            .groups
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    async fn update(&self, group: &Group) -> AuthResult<Option<Group>> {
        let mut tables = self.write()?;
        if tables
            .groups
            .values()
            .any(|g| g.name == group.name && g.id != group.id)
        {
            return Err(AuthError::already_exists(Entity::Group));
        }
        Ok(tables
            .groups
            .get_mut(&group.id)
            .map(|existing| std::mem::replace(existing, group.clone())))
    }

    async fn delete_by_id(&self, id: &str) -> AuthResult<Option<Group>> {
        let mut tables = self.write()?;
        let removed = tables.groups.remove(id);
        if removed.is_some() {
            tables.user_groups.retain(|(_, gid)| gid != id);
            tables.group_permissions.retain(|(gid, _)| gid != id);
        }
        Ok(removed)
    }
}

// =============================================================================
// Permissions
// =============================================================================

#[async_trait]
impl PermissionStorage for MemoryStorage {
    async fn create(&self, permission: &Permission) -> AuthResult<()> {
        let mut tables = self.write()?;
        if tables.permissions.contains_key(&permission.id)
            || tables.permissions.values().any(|p| p.name == permission.name)
        {
            return Err(AuthError::already_exists(Entity::Permission));
        }
        tables
            .permissions
            .insert(permission.id.clone(), permission.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<Permission>> {
        Ok(self.read()?.permissions.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Permission>> {
        Ok(self
            .read()?
            .permissions
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn update(&self, permission: &Permission) -> AuthResult<Option<Permission>> {
        let mut tables = self.write()?;
        if tables
            .permissions
            .values()
            .any(|p| p.name == permission.name && p.id != permission.id)
        {
            return Err(AuthError::already_exists(Entity::Permission));
        }
        Ok(tables
            .permissions
            .get_mut(&permission.id)
            .map(|existing| std::mem::replace(existing, permission.clone())))
    }

    async fn delete_by_id(&self, id: &str) -> AuthResult<Option<Permission>> {
        let mut tables = self.write()?;
        let removed = tables.permissions.remove(id);
        if removed.is_some() {
            tables.group_permissions.retain(|(_, pid)| pid != id);
        }
        Ok(removed)
    }

    async fn find_granting_group_ids(&self, permission_id: &str) -> AuthResult<Vec<String>> {
        Ok(self
            .read()?
            .group_permissions
            .iter()
            .filter(|(_, pid)| pid == permission_id)
            .map(|(gid, _)| gid.clone())
            .collect())
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStorage for MemoryStorage {
    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        Ok(self.read()?.user_where(|u| u.username == username))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.read()?.user_where(|u| u.email == email))
    }
}

// =============================================================================
// Memberships and grants
// =============================================================================

#[async_trait]
impl UserGroupStorage for MemoryStorage {
    async fn create(&self, membership: &UserGroup) -> AuthResult<()> {
        self.write()?.insert_user_group(membership)
    }

    async fn find(&self, user_id: &str, group_id: &str) -> AuthResult<Option<UserGroup>> {
        let key = (user_id.to_string(), group_id.to_string());
        Ok(self
            .read()?
            .user_groups
            .contains(&key)
            .then(|| UserGroup::new(user_id, group_id)))
    }

    async fn find_by_user_id(&self, user_id: &str) -> AuthResult<Vec<UserGroup>> {
        Ok(self
            .read()?
            .user_groups
            .iter()
            .filter(|(uid, _)| uid == user_id)
            .map(|(uid, gid)| UserGroup::new(uid.clone(), gid.clone()))
            .collect())
    }

    async fn delete(&self, user_id: &str, group_id: &str) -> AuthResult<bool> {
        let key = (user_id.to_string(), group_id.to_string());
        Ok(self.write()?.user_groups.remove(&key))
    }

    async fn group_has_permission(
        &self,
        group_id: &str,
        permission_name: &str,
    ) -> AuthResult<bool> {
        let tables = self.read()?;
        Ok(tables
            .group_permissions
            .iter()
            .filter(|(gid, _)| gid == group_id)
            .filter_map(|(_, pid)| tables.permissions.get(pid))
            .any(|p| p.name == permission_name))
    }
}

#[async_trait]
impl GroupPermissionStorage for MemoryStorage {
    async fn create(&self, grant: &GroupPermission) -> AuthResult<()> {
        let mut tables = self.write()?;
        if !tables.groups.contains_key(&grant.group_id)
            || !tables.permissions.contains_key(&grant.permission_id)
        {
            return Err(AuthError::storage(
                "group_permissions references a missing group or permission",
            ));
        }
        let inserted = tables
            .group_permissions
            .insert((grant.group_id.clone(), grant.permission_id.clone()));
        if !inserted {
            return Err(AuthError::already_exists(Entity::GroupPermission));
        }
        Ok(())
    }

    async fn find(
        &self,
        group_id: &str,
        permission_id: &str,
    ) -> AuthResult<Option<GroupPermission>> {
        let key = (group_id.to_string(), permission_id.to_string());
        Ok(self
            .read()?
            .group_permissions
            .contains(&key)
            .then(|| GroupPermission::new(group_id, permission_id)))
    }

    async fn delete(&self, group_id: &str, permission_id: &str) -> AuthResult<bool> {
        let key = (group_id.to_string(), permission_id.to_string());
        Ok(self.write()?.group_permissions.remove(&key))
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Buffers writes until commit; reads see committed rows plus the buffer.
struct MemoryRegistration {
    storage: MemoryStorage,
    users: Vec<User>,
    memberships: Vec<UserGroup>,
}

#[async_trait]
impl RegistrationStorage for MemoryStorage {
    async fn begin(&self) -> AuthResult<Box<dyn RegistrationTransaction>> {
        Ok(Box::new(MemoryRegistration {
            storage: self.clone(),
            users: Vec::new(),
            memberships: Vec::new(),
        }))
    }
}

#[async_trait]
impl RegistrationTransaction for MemoryRegistration {
    async fn find_user_by_username(&mut self, username: &str) -> AuthResult<Option<User>> {
        if let Some(user) = self.users.iter().find(|u| u.username == username) {
            return Ok(Some(user.clone()));
        }
        UserStorage::find_by_username(&self.storage, username).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> AuthResult<Option<User>> {
        if let Some(user) = self.users.iter().find(|u| u.email == email) {
            return Ok(Some(user.clone()));
        }
        UserStorage::find_by_email(&self.storage, email).await
    }

    async fn find_group_by_name(&mut self, name: &str) -> AuthResult<Option<Group>> {
        GroupStorage::find_by_name(&self.storage, name).await
    }

    async fn insert_user(&mut self, user: &User) -> AuthResult<()> {
        if self
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AuthError::IdentityTaken);
        }
        self.users.push(user.clone());
        Ok(())
    }

    async fn insert_user_group(&mut self, membership: &UserGroup) -> AuthResult<()> {
        self.memberships.push(membership.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AuthResult<()> {
        let mut tables = self.storage.write()?;
        let mut staged = tables.clone();
        for user in &self.users {
            staged.insert_user(user)?;
        }
        for membership in &self.memberships {
            staged.insert_user_group(membership)?;
        }
        *tables = staged;
        Ok(())
    }
}
