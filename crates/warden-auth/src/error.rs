//! Authentication and authorization error types.
//!
//! Every error carries an [`ErrorKind`] so that transports can pick a status
//! code by switching on the kind instead of comparing error values.

use std::fmt;

/// Entities managed by the service, used to report not-found and conflict
/// outcomes distinctly per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Group,
    Permission,
    UserGroup,
    GroupPermission,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Group => write!(f, "group"),
            Self::Permission => write!(f, "permission"),
            Self::UserGroup => write!(f, "user group"),
            Self::GroupPermission => write!(f, "group permission"),
        }
    }
}

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The requested entity does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Which entity was looked up.
        entity: Entity,
    },

    /// A unique constraint would be violated.
    #[error("{entity} already exists")]
    AlreadyExists {
        /// Which entity collided.
        entity: Entity,
    },

    /// Username or email is already registered.
    #[error("username or email already registered")]
    IdentityTaken,

    /// The authorization resolver denied the request.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// Unknown user or wrong password. The two cases are deliberately
    /// indistinguishable.
    #[error("wrong username or password")]
    WrongCredentials,

    /// The token is absent from the session store, malformed, signed with an
    /// unexpected method, or of the wrong type.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The relational store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The session store failed on a path where it is load-bearing.
    #[error("Cache error: {message}")]
    Cache {
        /// Description of the cache error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: Entity) -> Self {
        Self::NotFound { entity }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(entity: Entity) -> Self {
        Self::AlreadyExists { entity }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Cache` error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the kind used for transport status mapping.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } | Self::IdentityTaken => ErrorKind::Conflict,
            Self::Unauthorized { .. } | Self::WrongCredentials => ErrorKind::Unauthorized,
            Self::InvalidToken { .. } => ErrorKind::InvalidToken,
            Self::Storage { .. }
            | Self::Cache { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns `true` if this is a not-found outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns `true` if this is a unique-constraint conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Returns `true` if this is an authorization or credential failure.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    /// Returns `true` if this is a token error.
    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        self.kind() == ErrorKind::InvalidToken
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

/// Coarse error classification carried by every [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entity confirmed absent.
    NotFound,
    /// Unique constraint would be violated.
    Conflict,
    /// Authorization denied or wrong credentials.
    Unauthorized,
    /// Token absent, malformed or of the wrong type.
    InvalidToken,
    /// Backing-store or unexpected failure.
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "already_exists",
            Self::Unauthorized => "unauthorized",
            Self::InvalidToken => "invalid_token",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::not_found(Entity::Group);
        assert_eq!(err.to_string(), "group not found");

        let err = AuthError::already_exists(Entity::GroupPermission);
        assert_eq!(err.to_string(), "group permission already exists");

        let err = AuthError::invalid_token("expired");
        assert_eq!(err.to_string(), "Invalid token: expired");

        assert_eq!(
            AuthError::WrongCredentials.to_string(),
            "wrong username or password"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AuthError::not_found(Entity::User).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AuthError::already_exists(Entity::Permission).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(AuthError::IdentityTaken.kind(), ErrorKind::Conflict);
        assert_eq!(AuthError::WrongCredentials.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            AuthError::unauthorized("denied").kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            AuthError::invalid_token("bad").kind(),
            ErrorKind::InvalidToken
        );
        assert_eq!(AuthError::storage("down").kind(), ErrorKind::Internal);
        assert_eq!(AuthError::cache("down").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_client_vs_server() {
        assert!(AuthError::not_found(Entity::Group).is_client_error());
        assert!(AuthError::WrongCredentials.is_client_error());
        assert!(!AuthError::storage("x").is_client_error());
        assert!(AuthError::internal("x").is_server_error());
        assert!(AuthError::configuration("x").is_server_error());
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::Conflict.to_string(), "already_exists");
        assert_eq!(ErrorKind::InvalidToken.code(), "invalid_token");
    }
}
