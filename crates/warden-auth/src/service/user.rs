//! User orchestration: registration, login, session refresh and logout.
//!
//! ```ignore
//! use warden_auth::service::{RegisterRequest, UserService};
//!
//! let service = UserService::new(registrations, users, tokens, "DEFAULT");
//! let registered = service.register(request).await?;
//! let info = service.get_user_info(&registered.user.id).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::error::Entity;
use crate::password;
use crate::repository::UserRepository;
use crate::storage::{RegistrationStorage, User, UserGroup};
use crate::token::{TokenManager, TokenPair, TokenType};
use crate::{AuthError, AuthResult};

/// Input for [`UserService::register`].
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("full_name", &self.full_name)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Input for [`UserService::login`]. `username` may also be an email address.
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Public view of a user, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            deleted_at: user.deleted_at,
        }
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct Registered {
    pub user: UserInfo,
    pub tokens: TokenPair,
}

/// Account lifecycle use cases.
#[derive(Clone)]
pub struct UserService {
    registrations: Arc<dyn RegistrationStorage>,
    users: UserRepository,
    tokens: TokenManager,
    default_group: String,
}

impl UserService {
    #[must_use]
    pub fn new(
        registrations: Arc<dyn RegistrationStorage>,
        users: UserRepository,
        tokens: TokenManager,
        default_group: impl Into<String>,
    ) -> Self {
        Self {
            registrations,
            users,
            tokens,
            default_group: default_group.into(),
        }
    }

    /// Registers a user, attaches the default group and opens a session.
    ///
    /// The user row and membership are written in one transaction. The token
    /// pair is issued before commit and revoked again if the commit fails, so
    /// a failed registration leaves neither rows nor tokens behind.
    ///
    /// # Errors
    ///
    /// `IdentityTaken` if the username or email is registered already.
    #[instrument(skip(self, request), fields(username = %request.username, email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<Registered> {
        let mut tx = self.registrations.begin().await?;

        if tx.find_user_by_username(&request.username).await?.is_some()
            || tx.find_user_by_email(&request.email).await?.is_some()
        {
            return Err(AuthError::IdentityTaken);
        }

        let password_hash = hash_blocking(request.password).await?;
        let user = User::new(
            request.full_name,
            request.username,
            request.email,
            password_hash,
        );
        tx.insert_user(&user).await?;

        let group = tx
            .find_group_by_name(&self.default_group)
            .await?
            .ok_or_else(|| {
                error!(group = %self.default_group, "default group is missing, run the seeder");
                AuthError::configuration(format!(
                    "default group {} does not exist",
                    self.default_group
                ))
            })?;
        tx.insert_user_group(&UserGroup::new(&user.id, &group.id))
            .await?;

        let tokens = self.tokens.issue_pair(&user.id).await?;

        if let Err(e) = tx.commit().await {
            if let Err(cleanup) = self.tokens.revoke_pair(&user.id, &tokens.token_id).await {
                warn!(error = %cleanup, "failed to revoke tokens of rolled back registration");
            }
            return Err(e);
        }

        // A failed login before registration may have cached a not-found marker.
        self.users.invalidate(&user).await;

        info!(user_id = %user.id, "user registered");
        Ok(Registered {
            user: UserInfo::from(&user),
            tokens,
        })
    }

    /// Authenticates by username or email and opens a session.
    ///
    /// # Errors
    ///
    /// `WrongCredentials` for an unknown user and for a wrong password alike.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> AuthResult<TokenPair> {
        let user = match self.users.find_by_username(&request.username).await? {
            Some(user) => Some(user),
            None => self.users.find_by_email(&request.username).await?,
        };
        let Some(user) = user else {
            return Err(AuthError::WrongCredentials);
        };

        if !verify_blocking(request.password, user.password_hash.clone()).await? {
            return Err(AuthError::WrongCredentials);
        }

        let tokens = self.tokens.issue_pair(&user.id).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(tokens)
    }

    #[instrument(skip(self))]
    pub async fn get_user_info(&self, user_id: &str) -> AuthResult<UserInfo> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| UserInfo::from(&user))
            .ok_or_else(|| AuthError::not_found(Entity::User))
    }

    /// Rotates a session: revokes both halves of `token_id` and issues a new
    /// pair under a fresh token id.
    ///
    /// The refresh half is claimed by deleting it. Only the caller whose
    /// delete removed the key goes on to issue a pair, so concurrent
    /// refreshes with the same token yield a single new session.
    ///
    /// # Errors
    ///
    /// `InvalidToken` without writing to the store if the refresh half is no
    /// longer valid.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self, user_id: &str, token_id: &str) -> AuthResult<TokenPair> {
        if !self
            .tokens
            .revoke(user_id, token_id, TokenType::Refresh)
            .await?
        {
            return Err(AuthError::invalid_token("refresh token revoked or expired"));
        }

        self.tokens
            .revoke(user_id, token_id, TokenType::Access)
            .await?;
        info!(user_id = %user_id, token_id = %token_id, "session revoked");
        self.tokens.issue_pair(user_id).await
    }

    /// Ends a session by revoking both halves.
    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: &str, token_id: &str) -> AuthResult<()> {
        self.tokens.revoke_pair(user_id, token_id).await
    }
}

async fn hash_blocking(password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))?
}

async fn verify_blocking(password: String, hash: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))
}
