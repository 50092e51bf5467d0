//! User storage trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;

/// A registered identity.
///
/// The password hash is serialized so that cached copies can serve logins.
/// Filter it out before exposing a `User` over an API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user.
    pub id: String,

    /// Display name.
    pub full_name: String,

    /// Unique login name.
    pub username: String,

    /// Unique email address, also accepted as a login name.
    pub email: String,

    /// Argon2 PHC string.
    pub password_hash: String,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    /// Soft-delete marker. Not set by this service.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl User {
    /// Creates a user with a fresh id and current timestamps.
    #[must_use]
    pub fn new(
        full_name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        // Postgres keeps microseconds; truncate so cached and stored copies agree.
        let now = OffsetDateTime::now_utc();
        let now = now
            .replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            full_name: full_name.into(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Read-side storage operations for users. Users are inserted through
/// [`super::RegistrationStorage`].
#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;
}
