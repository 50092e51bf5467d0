//! Storage traits for identity and authorization data.
//!
//! This module defines the persistence interfaces used by the repositories.
//! Implementations are provided by storage backends:
//!
//! - [`memory::MemoryStorage`] - in-process tables for development and tests
//! - `warden-auth-postgres` - PostgreSQL via sqlx
//!
//! "Row not found" is never an error at this layer: finders return `None`
//! and deletes report whether a row existed.

pub mod group;
pub mod group_permission;
pub mod memory;
pub mod permission;
pub mod registration;
pub mod user;
pub mod user_group;

pub use group::{Group, GroupStorage};
pub use group_permission::{GroupPermission, GroupPermissionStorage};
pub use memory::MemoryStorage;
pub use permission::{Permission, PermissionStorage};
pub use registration::{RegistrationStorage, RegistrationTransaction};
pub use user::{User, UserStorage};
pub use user_group::{UserGroup, UserGroupStorage};

/// Every storage trait a backend must implement to serve the whole service.
pub trait AuthStorage:
    GroupStorage
    + PermissionStorage
    + UserStorage
    + UserGroupStorage
    + GroupPermissionStorage
    + RegistrationStorage
    + 'static
{
}

impl<T> AuthStorage for T where
    T: GroupStorage
        + PermissionStorage
        + UserStorage
        + UserGroupStorage
        + GroupPermissionStorage
        + RegistrationStorage
        + 'static
{
}
