//! # Auth Module
//!
//! Session-backed authentication and role/permission authorization.
//!
//! A request builds one [`Auth`] over its session, the shared user store
//! and an event sink, then calls `login`, `is_authenticated`, the
//! permission checks or `logout` on it.

pub mod config;
pub mod context;
pub mod credentials;
pub mod crypto;
pub mod errors;
pub mod events;
pub mod http;
pub mod permissions;
pub mod service;
pub mod session;
pub mod user;

pub use config::{AuthConfig, PasswordConfig};
pub use context::AuthContext;
pub use credentials::CredentialVerifier;
pub use crypto::PasswordManager;
pub use errors::{AuthError, AuthResult};
pub use events::{AuthEvent, AuthEventPayload, EventSink, LogEventSink, MemoryEventSink, NoopEventSink};
pub use http::Redirect;
pub use permissions::RoleCheck;
pub use service::Auth;
pub use session::{MemorySession, MemorySessionBackend, SessionStore};
pub use user::{AuthUser, InMemoryUserStore, Permission, Role, User, UserStore};
