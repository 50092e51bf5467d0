//! Cache-aside repository for users.

use std::sync::Arc;

use tracing::instrument;

use crate::AuthResult;
use crate::cache::{CacheAside, keys};
use crate::storage::{User, UserStorage};

/// Users with read-through caching by id, username and email.
#[derive(Clone)]
pub struct UserRepository {
    storage: Arc<dyn UserStorage>,
    cache: CacheAside,
}

impl UserRepository {
    #[must_use]
    pub fn new(storage: Arc<dyn UserStorage>, cache: CacheAside) -> Self {
        Self { storage, cache }
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        self.cache
            .read_through(&keys::user_by_id(id), || self.storage.find_by_id(id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        self.cache
            .read_through(&keys::user_by_username(username), || {
                self.storage.find_by_username(username)
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        self.cache
            .read_through(&keys::user_by_email(email), || {
                self.storage.find_by_email(email)
            })
            .await
    }

    /// Drops every cached view of a user written outside this repository.
    pub async fn invalidate(&self, user: &User) {
        self.cache
            .invalidate(&[
                keys::user_by_id(&user.id),
                keys::user_by_username(&user.username),
                keys::user_by_email(&user.email),
            ])
            .await;
    }
}
