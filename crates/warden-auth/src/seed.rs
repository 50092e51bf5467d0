//! Idempotent installation of the reserved permissions and groups.
//!
//! Runs as [`SYSTEM_PRINCIPAL`] through the administrative services, so it
//! uses the same cache invalidation as any other write. Running it again
//! only fills in whatever is missing.

use tracing::{debug, info, instrument};

use crate::constants::{SEED_PERMISSIONS, SYSTEM_PRINCIPAL, seed_groups};
use crate::service::{GroupPermissionService, GroupService, PermissionService};
use crate::storage::{Group, Permission};
use crate::AuthResult;

/// Counts of rows created by one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions: usize,
    pub groups: usize,
    pub grants: usize,
}

impl SeedReport {
    /// Whether the run changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

pub struct Seeder {
    groups: GroupService,
    permissions: PermissionService,
    grants: GroupPermissionService,
}

impl Seeder {
    #[must_use]
    pub fn new(
        groups: GroupService,
        permissions: PermissionService,
        grants: GroupPermissionService,
    ) -> Self {
        Self {
            groups,
            permissions,
            grants,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> AuthResult<SeedReport> {
        let mut report = SeedReport::default();

        let mut permissions = Vec::with_capacity(SEED_PERMISSIONS.len());
        for name in SEED_PERMISSIONS {
            let (permission, created) = self.ensure_permission(name).await?;
            report.permissions += usize::from(created);
            permissions.push(permission);
        }

        for (group_name, granted) in seed_groups() {
            let (group, created) = self.ensure_group(group_name).await?;
            report.groups += usize::from(created);

            for permission in permissions.iter().filter(|p| granted.contains(&p.name.as_str())) {
                if self.ensure_grant(&group, permission).await? {
                    report.grants += 1;
                }
            }
        }

        info!(
            permissions = report.permissions,
            groups = report.groups,
            grants = report.grants,
            "seeding finished"
        );
        Ok(report)
    }

    async fn ensure_permission(&self, name: &str) -> AuthResult<(Permission, bool)> {
        match self.permissions.find_by_name(SYSTEM_PRINCIPAL, name).await {
            Ok(permission) => Ok((permission, false)),
            Err(e) if e.is_not_found() => {
                let permission = self.permissions.create(SYSTEM_PRINCIPAL, name).await?;
                debug!(name = %name, "seeded permission");
                Ok((permission, true))
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_group(&self, name: &str) -> AuthResult<(Group, bool)> {
        match self.groups.find_by_name(SYSTEM_PRINCIPAL, name).await {
            Ok(group) => Ok((group, false)),
            Err(e) if e.is_not_found() => {
                let group = self.groups.create(SYSTEM_PRINCIPAL, name).await?;
                debug!(name = %name, "seeded group");
                Ok((group, true))
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_grant(&self, group: &Group, permission: &Permission) -> AuthResult<bool> {
        match self
            .grants
            .create(SYSTEM_PRINCIPAL, &group.id, &permission.id)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_conflict() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        DEFAULT_GROUP_PERMISSIONS, FULL_ACCESS, GROUP_CREATE, GROUP_DEFAULT, GROUP_READ,
        GROUP_SUPER_USER,
    };
    use crate::service::testing::{Harness, harness};
    use crate::storage::{UserGroup, UserGroupStorage};

    fn seeder(h: &Harness) -> Seeder {
        Seeder::new(
            GroupService::new(h.access.clone(), h.groups.clone()),
            PermissionService::new(h.access.clone(), h.permissions.clone()),
            GroupPermissionService::new(
                h.access.clone(),
                h.grants.clone(),
                h.groups.clone(),
                h.permissions.clone(),
            ),
        )
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let h = harness().await;
        let seeder = seeder(&h);

        let first = seeder.run().await.unwrap();
        // The harness already holds FULL_ACCESS.
        assert_eq!(first.permissions, SEED_PERMISSIONS.len() - 1);
        assert_eq!(first.groups, 2);
        assert_eq!(
            first.grants,
            DEFAULT_GROUP_PERMISSIONS.len() + SEED_PERMISSIONS.len()
        );

        let second = seeder.run().await.unwrap();
        assert!(second.is_noop());
    }

    #[tokio::test]
    async fn test_seeded_groups_grant_expected_permissions() {
        let h = harness().await;
        seeder(&h).run().await.unwrap();

        let default = h.groups.find_by_name(GROUP_DEFAULT).await.unwrap().unwrap();
        let super_user = h
            .groups
            .find_by_name(GROUP_SUPER_USER)
            .await
            .unwrap()
            .unwrap();
        let member = h.outsider.id.as_str();

        UserGroupStorage::create(&h.storage, &UserGroup::new(member, &default.id))
            .await
            .unwrap();
        assert!(h.access.check(member, &[GROUP_READ]).await.unwrap());
        assert!(!h.access.check(member, &[GROUP_CREATE]).await.unwrap());

        assert!(h.memberships.has_permission(&super_user.id, FULL_ACCESS).await.unwrap());
        assert!(h.memberships.has_permission(&super_user.id, GROUP_CREATE).await.unwrap());
    }
}
