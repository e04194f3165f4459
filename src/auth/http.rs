//! # HTTP Glue
//!
//! Redirects produced by the authorization gates, and HTTP conversions for
//! auth errors.

use std::fmt;

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::errors::AuthError;

/// Abort normal handling and send the client elsewhere.
///
/// Returned as the error arm of `require_*` gates; propagating it with `?`
/// is what keeps protected code from running.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a failed gate must abort the handler"]
pub struct Redirect {
    pub route: String,
}

impl Redirect {
    pub fn to(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redirect to {}", self.route)
    }
}

impl std::error::Error for Redirect {}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        axum::response::Redirect::to(&self.route).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        Self {
            error: err.user_message().to_string(),
            code: err.status_code(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let body = Json(ErrorResponse::from(self));

        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn test_redirect_response() {
        let response = Redirect::to("/login").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
    }

    #[test]
    fn test_error_response_status() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::StorageError("db down".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_uses_user_message() {
        let body = ErrorResponse::from(AuthError::StorageError("10.0.0.3 refused".into()));
        assert_eq!(body.code, 500);
        assert!(!body.error.contains("10.0.0.3"));
    }
}
