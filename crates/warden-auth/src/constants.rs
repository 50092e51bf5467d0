//! Reserved identities, well-known group and permission names, and the seed
//! catalogue installed by [`crate::seed::Seeder`].

/// Principal id of trusted internal callers. Bypasses authorization.
pub const SYSTEM_PRINCIPAL: &str = "SYSTEM";

pub const GROUP_DEFAULT: &str = "DEFAULT";
pub const GROUP_SUPER_USER: &str = "SUPER_USER";

pub const FULL_ACCESS: &str = "FULL_ACCESS";

/// Grants access to any principal with at least one group membership.
pub const GUEST_FULL_ACCESS: &str = "GUEST_FULL_ACCESS";

pub const GROUP_ALL: &str = "GROUP_ALL";
pub const GROUP_CREATE: &str = "GROUP_CREATE";
pub const GROUP_READ: &str = "GROUP_READ";
pub const GROUP_UPDATE: &str = "GROUP_UPDATE";
pub const GROUP_DELETE: &str = "GROUP_DELETE";

pub const PERMISSION_ALL: &str = "PERMISSION_ALL";
pub const PERMISSION_CREATE: &str = "PERMISSION_CREATE";
pub const PERMISSION_READ: &str = "PERMISSION_READ";
pub const PERMISSION_UPDATE: &str = "PERMISSION_UPDATE";
pub const PERMISSION_DELETE: &str = "PERMISSION_DELETE";

pub const GROUP_PERMISSION_ALL: &str = "GROUP_PERMISSION_ALL";
pub const GROUP_PERMISSION_CREATE: &str = "GROUP_PERMISSION_CREATE";
pub const GROUP_PERMISSION_READ: &str = "GROUP_PERMISSION_READ";
pub const GROUP_PERMISSION_DELETE: &str = "GROUP_PERMISSION_DELETE";

pub const USER_GROUP_ALL: &str = "USER_GROUP_ALL";
pub const USER_GROUP_CREATE: &str = "USER_GROUP_CREATE";
pub const USER_GROUP_READ: &str = "USER_GROUP_READ";
pub const USER_GROUP_DELETE: &str = "USER_GROUP_DELETE";

/// Every permission installed by the seeder.
pub const SEED_PERMISSIONS: &[&str] = &[
    FULL_ACCESS,
    GUEST_FULL_ACCESS,
    GROUP_ALL,
    GROUP_CREATE,
    GROUP_READ,
    GROUP_UPDATE,
    GROUP_DELETE,
    PERMISSION_ALL,
    PERMISSION_CREATE,
    PERMISSION_READ,
    PERMISSION_UPDATE,
    PERMISSION_DELETE,
    GROUP_PERMISSION_ALL,
    GROUP_PERMISSION_CREATE,
    GROUP_PERMISSION_READ,
    GROUP_PERMISSION_DELETE,
    USER_GROUP_ALL,
    USER_GROUP_CREATE,
    USER_GROUP_READ,
    USER_GROUP_DELETE,
];

/// Permissions granted to [`GROUP_DEFAULT`] by the seeder.
pub const DEFAULT_GROUP_PERMISSIONS: &[&str] = &[
    GROUP_READ,
    PERMISSION_READ,
    GROUP_PERMISSION_READ,
    USER_GROUP_READ,
];

/// Seeded groups with their grants. `SUPER_USER` holds everything.
#[must_use]
pub fn seed_groups() -> [(&'static str, &'static [&'static str]); 2] {
    [
        (GROUP_DEFAULT, DEFAULT_GROUP_PERMISSIONS),
        (GROUP_SUPER_USER, SEED_PERMISSIONS),
    ]
}
