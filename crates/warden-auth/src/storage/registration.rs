//! Transaction-scoped storage for user registration.
//!
//! Registration writes a user row and its default membership atomically. The
//! transaction is an explicit value: every read and write goes through the
//! handle, and the boundary ends with [`RegistrationTransaction::commit`].
//! Dropping a handle without committing rolls everything back.

use async_trait::async_trait;

use super::{Group, User, UserGroup};
use crate::AuthResult;

/// Opens registration transactions.
#[async_trait]
pub trait RegistrationStorage: Send + Sync {
    /// Begins a repeatable-read transaction.
    async fn begin(&self) -> AuthResult<Box<dyn RegistrationTransaction>>;
}

/// Reads and writes inside one open registration transaction.
#[async_trait]
pub trait RegistrationTransaction: Send {
    async fn find_user_by_username(&mut self, username: &str) -> AuthResult<Option<User>>;

    async fn find_user_by_email(&mut self, email: &str) -> AuthResult<Option<User>>;

    async fn find_group_by_name(&mut self, name: &str) -> AuthResult<Option<Group>>;

    /// Inserts the user. Fails with a conflict if username or email is taken.
    async fn insert_user(&mut self, user: &User) -> AuthResult<()>;

    async fn insert_user_group(&mut self, membership: &UserGroup) -> AuthResult<()>;

    /// Makes every write visible.
    async fn commit(self: Box<Self>) -> AuthResult<()>;
}
