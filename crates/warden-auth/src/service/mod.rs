//! Use cases exposed to the transport layer.
//!
//! [`UserService`] covers the account lifecycle. The administrative services
//! manage groups, permissions and the links between them; every operation
//! takes the acting principal explicitly and requires it to hold
//! `FULL_ACCESS`, the entity's `*_ALL` permission or the specific action
//! permission.

mod group;
mod group_permission;
mod permission;
mod user;
mod user_group;

pub use group::GroupService;
pub use group_permission::GroupPermissionService;
pub use permission::PermissionService;
pub use user::{LoginRequest, RegisterRequest, Registered, UserInfo, UserService};
pub use user_group::UserGroupService;

use std::sync::Arc;

use crate::access::AccessResolver;
use crate::cache::{CacheAside, CacheStore};
use crate::config::AuthConfig;
use crate::repository::{
    GroupPermissionRepository, GroupRepository, PermissionRepository, UserGroupRepository,
    UserRepository,
};
use crate::seed::Seeder;
use crate::storage::AuthStorage;
use crate::token::TokenManager;

/// Every use case, wired over one storage backend and one cache store.
#[derive(Clone)]
pub struct Services {
    pub access: AccessResolver,
    pub tokens: TokenManager,
    pub users: UserService,
    pub groups: GroupService,
    pub permissions: PermissionService,
    pub user_groups: UserGroupService,
    pub group_permissions: GroupPermissionService,
}

impl Services {
    /// Builds repositories and services. The same cache store holds entity
    /// lookups and token validity.
    #[must_use]
    pub fn build<S: AuthStorage>(
        storage: Arc<S>,
        store: Arc<dyn CacheStore>,
        config: &AuthConfig,
    ) -> Self {
        let cache = CacheAside::new(Arc::clone(&store), config.cache_ttl);

        let users = UserRepository::new(storage.clone(), cache.clone());
        let groups = GroupRepository::new(storage.clone(), cache.clone());
        let permissions = PermissionRepository::new(storage.clone(), cache.clone());
        let memberships = UserGroupRepository::new(storage.clone(), cache.clone());
        let grants = GroupPermissionRepository::new(storage.clone(), cache);

        let access = AccessResolver::new(
            Arc::new(memberships.clone()),
            config.max_concurrent_group_checks,
        );
        let tokens = TokenManager::from_config(config, store);

        Self {
            users: UserService::new(
                storage,
                users.clone(),
                tokens.clone(),
                config.default_group.clone(),
            ),
            groups: GroupService::new(access.clone(), groups.clone()),
            permissions: PermissionService::new(access.clone(), permissions.clone()),
            user_groups: UserGroupService::new(
                access.clone(),
                memberships,
                users,
                groups.clone(),
            ),
            group_permissions: GroupPermissionService::new(
                access.clone(),
                grants,
                groups,
                permissions,
            ),
            access,
            tokens,
        }
    }

    /// Seeder acting through these services.
    #[must_use]
    pub fn seeder(&self) -> Seeder {
        Seeder::new(
            self.groups.clone(),
            self.permissions.clone(),
            self.group_permissions.clone(),
        )
    }
}
