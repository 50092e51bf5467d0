//! Token lifecycle manager.
//!
//! States per session: issued (key written), valid (key present), revoked
//! (key deleted) and expired (key TTL elapsed). Revoked and expired are
//! indistinguishable to callers. Unlike entity caching, the cache store is
//! load-bearing here, so its failures surface as errors.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use super::{JwtCodec, Session, TokenPair, TokenType};
use crate::cache::CacheStore;
use crate::config::AuthConfig;
use crate::{AuthError, AuthResult};

/// Issues, validates, rotates and revokes session tokens.
#[derive(Clone)]
pub struct TokenManager {
    codec: JwtCodec,
    store: Arc<dyn CacheStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    #[must_use]
    pub fn new(
        codec: JwtCodec,
        store: Arc<dyn CacheStore>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            codec,
            store,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Builds a manager from configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig, store: Arc<dyn CacheStore>) -> Self {
        Self::new(
            JwtCodec::new(config.token_secret.as_bytes(), config.issuer.clone()),
            store,
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    /// Lifetime of the given token type.
    #[must_use]
    pub fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Signs one half of a session and records it as valid.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        user_id: &str,
        token_id: &str,
        token_type: TokenType,
    ) -> AuthResult<String> {
        let ttl = self.ttl(token_type);
        let claims = self.codec.claims(user_id, token_id, token_type, ttl);
        let token = self
            .codec
            .encode(&claims)
            .map_err(|e| AuthError::internal(e.to_string()))?;

        self.store
            .set_ex(
                &token_type.cache_key(user_id, token_id),
                token.as_bytes(),
                ttl,
            )
            .await
            .map_err(|e| AuthError::cache(e.to_string()))?;
        Ok(token)
    }

    /// Whether this half of the session has been issued and not yet revoked
    /// or expired.
    #[instrument(skip(self))]
    pub async fn is_valid(
        &self,
        user_id: &str,
        token_id: &str,
        token_type: TokenType,
    ) -> AuthResult<bool> {
        self.store
            .exists(&token_type.cache_key(user_id, token_id))
            .await
            .map_err(|e| AuthError::cache(e.to_string()))
    }

    /// Revokes one half of a session. Revoking an absent token succeeds.
    ///
    /// Returns `true` only for the caller whose delete removed the key, so
    /// of several concurrent revocations of the same half exactly one wins.
    #[instrument(skip(self))]
    pub async fn revoke(
        &self,
        user_id: &str,
        token_id: &str,
        token_type: TokenType,
    ) -> AuthResult<bool> {
        self.store
            .del(&token_type.cache_key(user_id, token_id))
            .await
            .map_err(|e| AuthError::cache(e.to_string()))
    }

    /// Issues a new session: both halves under a freshly minted token id.
    ///
    /// If the refresh half cannot be issued the access half is revoked again.
    #[instrument(skip(self))]
    pub async fn issue_pair(&self, user_id: &str) -> AuthResult<TokenPair> {
        let token_id = uuid::Uuid::new_v4().to_string();

        let access_token = self.create(user_id, &token_id, TokenType::Access).await?;
        let refresh_token = match self.create(user_id, &token_id, TokenType::Refresh).await {
            Ok(token) => token,
            Err(e) => {
                if let Err(cleanup) = self.revoke(user_id, &token_id, TokenType::Access).await {
                    warn!(error = %cleanup, "failed to revoke orphaned access token");
                }
                return Err(e);
            }
        };

        info!(user_id = %user_id, token_id = %token_id, "session issued");
        Ok(TokenPair {
            token_id,
            access_token,
            refresh_token,
        })
    }

    /// Revokes both halves of a session.
    #[instrument(skip(self))]
    pub async fn revoke_pair(&self, user_id: &str, token_id: &str) -> AuthResult<()> {
        self.revoke(user_id, token_id, TokenType::Access).await?;
        self.revoke(user_id, token_id, TokenType::Refresh).await?;
        info!(user_id = %user_id, token_id = %token_id, "session revoked");
        Ok(())
    }

    /// Parses a raw bearer token and checks that it is of the expected type
    /// and still valid in the store.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is malformed, expired, signed with
    /// another key or algorithm, of the other type, or revoked.
    pub async fn authenticate(&self, raw: &str, expected: TokenType) -> AuthResult<Session> {
        let claims = self
            .codec
            .decode(raw)
            .map_err(|e| AuthError::invalid_token(e.to_string()))?;

        if claims.typ != expected {
            return Err(AuthError::invalid_token(format!(
                "expected {expected} token, got {}",
                claims.typ
            )));
        }

        if !self.is_valid(&claims.user_id, &claims.jti, expected).await? {
            return Err(AuthError::invalid_token("token revoked or expired"));
        }

        Ok(Session {
            user_id: claims.user_id,
            token_id: claims.jti,
            token_type: expected,
        })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("codec", &self.codec)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}
