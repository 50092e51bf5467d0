//! HS256 JWT encoding and validation for session tokens.
//!
//! Tokens carry the registered `exp`, `iat`, `iss` and `jti` claims plus a
//! `userID` claim and a `typ` claim naming the half of the pair they belong
//! to. Tokens signed with any algorithm other than HS256 are rejected.

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::TokenType;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token was signed with an algorithm other than HS256.
    #[error("Unexpected signing method")]
    UnexpectedAlgorithm,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::UnexpectedAlgorithm
            }
            ErrorKind::InvalidIssuer | ErrorKind::MissingRequiredClaim(_) => {
                Self::invalid_claims(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Expiration as seconds since the Unix epoch.
    pub exp: i64,

    /// Issued-at as seconds since the Unix epoch.
    pub iat: i64,

    /// Issuer.
    pub iss: String,

    /// Session identifier shared by both halves of a pair.
    pub jti: String,

    /// Owner of the session.
    #[serde(rename = "userID")]
    pub user_id: String,

    /// Which half of the pair this token is.
    pub typ: TokenType,
}

// ============================================================================
// Codec
// ============================================================================

/// Signs and validates session JWTs with a shared secret.
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    /// Creates a codec for the given secret and issuer.
    #[must_use]
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    /// Returns the configured issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Builds claims for a token expiring `lifetime` from now.
    #[must_use]
    pub fn claims(
        &self,
        user_id: &str,
        token_id: &str,
        token_type: TokenType,
        lifetime: std::time::Duration,
    ) -> SessionClaims {
        let now = OffsetDateTime::now_utc();
        let exp = now + lifetime;
        SessionClaims {
            exp: exp.unix_timestamp(),
            iat: now.unix_timestamp(),
            iss: self.issuer.clone(),
            jti: token_id.to_string(),
            user_id: user_id.to_string(),
            typ: token_type,
        }
    }

    /// Signs the claims with HS256.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes and validates a token: HS256 only, issuer and expiry checked.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, expired, signed with a
    /// different key or algorithm, or issued by someone else.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "jti"]);
        validation.validate_exp = true;
        validation.validate_aud = false;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        if data.claims.jti.is_empty() || data.claims.user_id.is_empty() {
            return Err(JwtError::invalid_claims("empty jti or userID"));
        }
        Ok(data.claims)
    }
}
