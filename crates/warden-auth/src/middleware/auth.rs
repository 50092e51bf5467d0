//! Bearer token extractors.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use warden_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn whoami(BearerAuth(session): BearerAuth) -> String {
//!     session.user_id
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .with_state(auth_state);
//! ```

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::token::{Session, TokenManager, TokenType};

// =============================================================================
// Auth State
// =============================================================================

/// State required by the bearer extractors.
///
/// Include it in the application state and expose it through `FromRef`:
///
/// ```ignore
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthState {
    pub tokens: TokenManager,
}

impl AuthState {
    #[must_use]
    pub fn new(tokens: TokenManager) -> Self {
        Self { tokens }
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Session authenticated by an access token.
pub struct BearerAuth(pub Session);

/// Session authenticated by a refresh token.
pub struct RefreshAuth(pub Session);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state, TokenType::Access).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RefreshAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state, TokenType::Refresh).await.map(Self)
    }
}

async fn authenticate<S>(parts: &Parts, state: &S, expected: TokenType) -> Result<Session, AuthError>
where
    AuthState: FromRef<S>,
{
    let auth_state = AuthState::from_ref(state);
    let token = bearer_token(parts)?;
    auth_state.tokens.authenticate(token, expected).await
}

/// Returns the token of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AuthError::invalid_token("missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::invalid_token("expected a Bearer token"))
}
