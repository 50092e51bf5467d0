//! Cache-aside repositories.
//!
//! Each repository pairs a storage trait object with the shared
//! [`CacheAside`](crate::cache::CacheAside) helper. Reads go through the cache
//! and cache confirmed absence; writes hit storage and then invalidate every
//! key that could hold a stale view. Finders return `Ok(None)` for absent
//! rows so callers can tell "confirmed absent" from "lookup failed".

mod group;
mod group_permission;
mod permission;
mod user;
mod user_group;

pub use group::GroupRepository;
pub use group_permission::GroupPermissionRepository;
pub use permission::PermissionRepository;
pub use user::UserRepository;
pub use user_group::UserGroupRepository;
