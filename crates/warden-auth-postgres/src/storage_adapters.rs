//! Core storage trait implementations for [`PostgresAuthStorage`].
//!
//! Each method borrows a per-table storage from the shared pool and converts
//! [`StorageError`](crate::StorageError) into the core error, reporting
//! constraint conflicts against the table's entity.

use async_trait::async_trait;

use warden_auth::storage::{
    Group, GroupPermission, GroupPermissionStorage as GroupPermissionStorageTrait,
    GroupStorage as GroupStorageTrait, Permission, PermissionStorage as PermissionStorageTrait,
    RegistrationStorage, RegistrationTransaction, User, UserGroup,
    UserGroupStorage as UserGroupStorageTrait, UserStorage as UserStorageTrait,
};
use warden_auth::{AuthResult, Entity};

use crate::PostgresAuthStorage;
use crate::registration::PgRegistration;

// =============================================================================
// Groups and permissions
// =============================================================================

#[async_trait]
impl GroupStorageTrait for PostgresAuthStorage {
    async fn create(&self, group: &Group) -> AuthResult<()> {
        self.groups()
            .create(group)
            .await
            .map_err(|e| e.into_auth(Entity::Group))
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<Group>> {
        self.groups()
            .find_by_id(id)
            .await
            .map_err(|e| e.into_auth(Entity::Group))
    }

    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Group>> {
        self.groups()
            .find_by_name(name)
            .await
            .map_err(|e| e.into_auth(Entity::Group))
    }

    async fn update(&self, group: &Group) -> AuthResult<Option<Group>> {
        self.groups()
            .update(group)
            .await
            .map_err(|e| e.into_auth(Entity::Group))
    }

    async fn delete_by_id(&self, id: &str) -> AuthResult<Option<Group>> {
        self.groups()
            .delete_by_id(id)
            .await
            .map_err(|e| e.into_auth(Entity::Group))
    }
}

#[async_trait]
impl PermissionStorageTrait for PostgresAuthStorage {
    async fn create(&self, permission: &Permission) -> AuthResult<()> {
        self.permissions()
            .create(permission)
            .await
            .map_err(|e| e.into_auth(Entity::Permission))
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<Permission>> {
        self.permissions()
            .find_by_id(id)
            .await
            .map_err(|e| e.into_auth(Entity::Permission))
    }

    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Permission>> {
        self.permissions()
            .find_by_name(name)
            .await
            .map_err(|e| e.into_auth(Entity::Permission))
    }

    async fn update(&self, permission: &Permission) -> AuthResult<Option<Permission>> {
        self.permissions()
            .update(permission)
            .await
            .map_err(|e| e.into_auth(Entity::Permission))
    }

    async fn delete_by_id(&self, id: &str) -> AuthResult<Option<Permission>> {
        self.permissions()
            .delete_by_id(id)
            .await
            .map_err(|e| e.into_auth(Entity::Permission))
    }

    async fn find_granting_group_ids(&self, permission_id: &str) -> AuthResult<Vec<String>> {
        self.permissions()
            .find_granting_group_ids(permission_id)
            .await
            .map_err(|e| e.into_auth(Entity::Permission))
    }
}

// =============================================================================
// Users and associations
// =============================================================================

#[async_trait]
impl UserStorageTrait for PostgresAuthStorage {
    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        self.users()
            .find_by_id(id)
            .await
            .map_err(|e| e.into_auth(Entity::User))
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        self.users()
            .find_by_username(username)
            .await
            .map_err(|e| e.into_auth(Entity::User))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        self.users()
            .find_by_email(email)
            .await
            .map_err(|e| e.into_auth(Entity::User))
    }
}

#[async_trait]
impl UserGroupStorageTrait for PostgresAuthStorage {
    async fn create(&self, membership: &UserGroup) -> AuthResult<()> {
        self.user_groups()
            .create(membership)
            .await
            .map_err(|e| e.into_auth(Entity::UserGroup))
    }

    async fn find(&self, user_id: &str, group_id: &str) -> AuthResult<Option<UserGroup>> {
        self.user_groups()
            .find(user_id, group_id)
            .await
            .map_err(|e| e.into_auth(Entity::UserGroup))
    }

    async fn find_by_user_id(&self, user_id: &str) -> AuthResult<Vec<UserGroup>> {
        self.user_groups()
            .find_by_user_id(user_id)
            .await
            .map_err(|e| e.into_auth(Entity::UserGroup))
    }

    async fn delete(&self, user_id: &str, group_id: &str) -> AuthResult<bool> {
        self.user_groups()
            .delete(user_id, group_id)
            .await
            .map_err(|e| e.into_auth(Entity::UserGroup))
    }

    async fn group_has_permission(
        &self,
        group_id: &str,
        permission_name: &str,
    ) -> AuthResult<bool> {
        self.user_groups()
            .group_has_permission(group_id, permission_name)
            .await
            .map_err(|e| e.into_auth(Entity::GroupPermission))
    }
}

#[async_trait]
impl GroupPermissionStorageTrait for PostgresAuthStorage {
    async fn create(&self, grant: &GroupPermission) -> AuthResult<()> {
        self.group_permissions()
            .create(grant)
            .await
            .map_err(|e| e.into_auth(Entity::GroupPermission))
    }

    async fn find(
        &self,
        group_id: &str,
        permission_id: &str,
    ) -> AuthResult<Option<GroupPermission>> {
        self.group_permissions()
            .find(group_id, permission_id)
            .await
            .map_err(|e| e.into_auth(Entity::GroupPermission))
    }

    async fn delete(&self, group_id: &str, permission_id: &str) -> AuthResult<bool> {
        self.group_permissions()
            .delete(group_id, permission_id)
            .await
            .map_err(|e| e.into_auth(Entity::GroupPermission))
    }
}

#[async_trait]
impl RegistrationStorage for PostgresAuthStorage {
    async fn begin(&self) -> AuthResult<Box<dyn RegistrationTransaction>> {
        let tx = PgRegistration::begin(self.pool())
            .await
            .map_err(|e| e.into_auth(Entity::User))?;
        Ok(Box::new(tx))
    }
}
