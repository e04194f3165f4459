//! # Auth Errors
//!
//! Error types for the authentication module.
//!
//! Expected failures (bad credentials, inactive accounts, password
//! mismatches) are returned as values and recorded on the request's
//! [`AuthContext`](super::context::AuthContext). `InvalidArgument` is a
//! caller bug, never a security event.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    // ==================
    // Authentication Errors
    // ==================

    /// Unknown username or wrong password (generic - don't leak which)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Credentials were correct but the account is disabled
    #[error("Account is not active")]
    InactiveAccount,

    /// Operation requires an authenticated session
    #[error("Authentication required")]
    NotAuthenticated,

    // ==================
    // Password Rotation Errors
    // ==================

    /// New password and its repetition differ
    #[error("New password and repeat password do not match")]
    NewPasswordMismatch,

    /// Supplied old password does not verify against the stored hash
    #[error("Old password does not match")]
    OldPasswordMismatch,

    // ==================
    // Programmer Errors
    // ==================

    /// Caller passed a malformed argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration rejected at load time
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    // ==================
    // Internal Errors
    // ==================

    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Session or user storage operation failed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Worker failure or timeout while hashing / verifying
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            AuthError::NewPasswordMismatch => 400,
            AuthError::OldPasswordMismatch => 400,
            AuthError::InvalidArgument(_) => 400,

            // 401 Unauthorized
            AuthError::InvalidCredentials => 401,
            AuthError::NotAuthenticated => 401,

            // 403 Forbidden
            AuthError::InactiveAccount => 403,

            // 500 Internal Server Error
            AuthError::ConfigError(_) => 500,
            AuthError::HashingFailed => 500,
            AuthError::StorageError(_) => 500,
            AuthError::InternalError(_) => 500,
        }
    }

    /// Returns whether this error should be logged at warn level
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Message safe to show to the end user.
    ///
    /// Internal failures collapse into one generic line so storage or
    /// worker details never reach a login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid credentials. Please try again.",
            AuthError::InactiveAccount => "Your account is not active.",
            AuthError::NotAuthenticated => "You must be logged in to do that.",
            AuthError::OldPasswordMismatch => {
                "The old password is not a match to what we have."
            }
            AuthError::NewPasswordMismatch => {
                "The new password and the repeat password don't match."
            }
            AuthError::InvalidArgument(_) => "The request was malformed.",
            AuthError::ConfigError(_)
            | AuthError::HashingFailed
            | AuthError::StorageError(_)
            | AuthError::InternalError(_) => "Something went wrong. Please try again later.",
        }
    }
}
