//! Session token issuance and lifecycle.
//!
//! A session is identified by a token id shared by exactly one access token
//! and one refresh token. Each half is a signed JWT whose validity is recorded
//! in the cache store under a type-specific key with a TTL equal to the
//! token's own lifetime; the signature alone is not sufficient.
//!
//! - [`jwt`] - HS256 codec and claims
//! - [`manager`] - issue, validate, revoke and authenticate

pub mod jwt;
pub mod manager;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::keys;

pub use jwt::{JwtCodec, JwtError, SessionClaims};
pub use manager::TokenManager;

/// Which half of a session pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    /// Cache key recording validity of this half of a session.
    #[must_use]
    pub fn cache_key(self, user_id: &str, token_id: &str) -> String {
        match self {
            Self::Access => keys::access_token(user_id, token_id),
            Self::Refresh => keys::refresh_token(user_id, token_id),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Session identifier shared by both tokens.
    #[serde(skip)]
    pub token_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// An authenticated session extracted from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub token_id: String,
    pub token_type: TokenType,
}
