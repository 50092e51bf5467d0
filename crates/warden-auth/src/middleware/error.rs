//! Error responses.
//!
//! `AuthError` renders as `{"error": <kind code>, "message": <display>}` with
//! the status of its [`ErrorKind`]. 401 responses carry a
//! `WWW-Authenticate: Bearer` challenge.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{AuthError, ErrorKind};

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({
            "error": kind.code(),
            "message": self.to_string(),
        });

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!("Bearer error=\"{}\"", kind.code());
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

/// HTTP status for an error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized | ErrorKind::InvalidToken => StatusCode::UNAUTHORIZED,
        ErrorKind::Conflict => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
