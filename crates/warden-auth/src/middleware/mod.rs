//! Axum integration.
//!
//! - [`BearerAuth`] / [`RefreshAuth`] extract a validated session from an
//!   `Authorization: Bearer` header
//! - `AuthError` implements `IntoResponse` (see [`error`])

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth, RefreshAuth};
pub use error::status_for;
