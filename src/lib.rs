//! aeroauth - session-backed authentication and authorization
//!
//! Credential verification, session identity hydration, role/permission
//! checks and the password lifecycle. Session storage, user storage and
//! routing stay with the caller behind traits.

pub mod auth;
pub mod cli;

pub use auth::{
    Auth, AuthConfig, AuthContext, AuthError, AuthResult, AuthUser, PasswordManager, Redirect,
    SessionStore, User, UserStore,
};
