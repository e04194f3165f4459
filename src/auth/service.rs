//! # Auth Engine
//!
//! One [`Auth`] per request. It binds a verified identity to the session,
//! lazily rehydrates it on later requests, and tears it down on logout.
//! Authorization checks live in [`super::permissions`].
//!
//! ## Invariants
//! - Session id is regenerated before the user id is written on login
//! - A hydrated user always matches the id currently in the session
//! - Expected failures leave the context as it was, apart from
//!   `last_error`

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::config::AuthConfig;
use super::context::AuthContext;
use super::credentials::CredentialVerifier;
use super::crypto::{compare_passwords, PasswordManager};
use super::errors::{AuthError, AuthResult};
use super::events::{AuthEvent, AuthEventPayload, EventSink, NoopEventSink};
use super::http::Redirect;
use super::session::SessionStore;
use super::user::{AuthUser, Permission, Role, UserStore};

/// Per-request authentication engine
pub struct Auth<U, R, S> {
    pub(super) config: AuthConfig,
    verifier: CredentialVerifier<U, R>,
    session: S,
    events: Arc<dyn EventSink>,
    pub(super) ctx: AuthContext<U>,
}

impl<U: AuthUser, R: UserStore<U>, S: SessionStore> Auth<U, R, S> {
    /// Build an engine over the request's session.
    ///
    /// Nothing is read from the session until the first check.
    pub fn new(config: AuthConfig, users: R, session: S) -> AuthResult<Self> {
        config.validate()?;
        let passwords = PasswordManager::new(&config.password)?;

        Ok(Self {
            config,
            verifier: CredentialVerifier::new(users, passwords),
            session,
            events: Arc::new(NoopEventSink),
            ctx: AuthContext::new(),
        })
    }

    /// Replace the password manager, e.g. to share one across requests
    pub fn with_password_manager(mut self, passwords: PasswordManager) -> Self {
        self.verifier = self.verifier.with_passwords(passwords);
        self
    }

    /// Install a sink for login/logout signals
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn context(&self) -> &AuthContext<U> {
        &self.ctx
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn passwords(&self) -> &PasswordManager {
        self.verifier.passwords()
    }

    /// The hydrated user, without consulting the session
    pub fn user(&self) -> Option<&U> {
        self.ctx.current_user.as_ref()
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.ctx.roles.iter()
    }

    pub fn permissions(&self) -> impl Iterator<Item = &Permission> {
        self.ctx.permissions.iter()
    }

    pub fn last_error(&self) -> Option<&AuthError> {
        self.ctx.last_error.as_ref()
    }

    /// User-facing text for the last failure
    pub fn error_message(&self) -> Option<&'static str> {
        self.ctx.last_error.as_ref().map(AuthError::user_message)
    }

    /// Record an expected failure and hand it back
    fn fail<T>(&mut self, err: AuthError) -> AuthResult<T> {
        if err.is_client_error() {
            warn!(event = "AUTH_REJECTED", reason = %err, "auth operation rejected");
        } else {
            error!(event = "AUTH_FAILED", reason = %err, "auth operation failed");
        }
        self.ctx.last_error = Some(err.clone());
        Err(err)
    }

    fn publish(&self, event: AuthEvent) {
        let payload = AuthEventPayload::from_context(&self.ctx);
        self.events.publish(event, &payload);
    }

    /// Check credentials without touching the session.
    pub fn authorize(&mut self, username: &str, password: &str) -> AuthResult<U> {
        match self.verifier.authorize(username, password) {
            Ok(user) => Ok(user),
            Err(e) => self.fail(e),
        }
    }

    /// Check credentials and bind the user to the session.
    ///
    /// On a credential failure neither the context (apart from
    /// `last_error`) nor the session is modified.
    ///
    /// A store failure after the credentials verify is not rolled back.
    /// The session id is regenerated before the user id is written, so if
    /// that write fails the pre-login data already lives under a new id
    /// the client never received, and the old id resolves to nothing. The
    /// login fails with `StorageError` and the client starts over with an
    /// empty session.
    pub fn login(&mut self, username: &str, password: &str) -> AuthResult<U> {
        let user = self.authorize(username, password)?;
        self.complete_login(user)
    }

    /// [`Auth::login`] with password verification on tokio's blocking pool.
    pub async fn login_offloaded(
        &mut self,
        username: &str,
        password: Zeroizing<String>,
    ) -> AuthResult<U> {
        let user = match self.verifier.authorize_offloaded(username, password).await {
            Ok(user) => user,
            Err(e) => return self.fail(e),
        };
        self.complete_login(user)
    }

    fn complete_login(&mut self, user: U) -> AuthResult<U> {
        if let Err(e) = self.bind_session(&user) {
            return self.fail(e);
        }

        self.ctx.hydrate(user.clone());
        self.ctx.last_error = None;
        info!(event = "AUTH_LOGIN_SUCCESS", user_id = %user.id(), "user logged in");
        self.publish(AuthEvent::LoginSuccess);

        Ok(user)
    }

    fn bind_session(&self, user: &U) -> AuthResult<()> {
        // New id first: a pre-login id must never carry the login
        self.session.regenerate_id(true)?;
        self.session
            .write(&self.config.session_key, &user.id().to_string())
    }

    /// Whether the session carries a user that still exists, hydrating the
    /// context on first use.
    pub fn is_authenticated(&mut self) -> bool {
        let raw = match self.session.read(&self.config.session_key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                self.ctx.clear_identity();
                return false;
            }
            Err(e) => {
                error!(event = "AUTH_SESSION_READ_FAILED", reason = %e, "session read failed");
                self.ctx.clear_identity();
                return false;
            }
        };

        let user_id = match Uuid::parse_str(&raw) {
            Ok(id) => id,
            Err(_) => {
                warn!(event = "AUTH_SESSION_GARBAGE", "session holds a malformed user id");
                self.ctx.clear_identity();
                return false;
            }
        };

        if self.ctx.is_hydrated_for(user_id) {
            return true;
        }

        self.ctx.clear_identity();
        match self.verifier.users().find_by_id(user_id) {
            Ok(Some(user)) => {
                self.ctx.hydrate(user);
                true
            }
            Ok(None) => {
                warn!(event = "AUTH_REHYDRATE_MISS", user_id = %user_id, "session points at a missing user");
                false
            }
            Err(e) => {
                error!(event = "AUTH_REHYDRATE_FAILED", user_id = %user_id, reason = %e, "user lookup failed");
                false
            }
        }
    }

    /// End the session.
    ///
    /// The context is reset even when the store fails, so nothing
    /// downstream in this request still sees the user. The redirect
    /// afterwards is the caller's concern; see [`Auth::logout_and_redirect`].
    pub fn logout(&mut self) -> AuthResult<()> {
        self.publish(AuthEvent::BeforeLogout);
        let user_id = self.ctx.user_id();

        let cleared = self.clear_session();
        self.ctx.reset();

        match cleared {
            Ok(()) => {
                info!(event = "AUTH_LOGOUT", user_id = ?user_id, "user logged out");
                self.publish(AuthEvent::LogoutSuccess);
                Ok(())
            }
            Err(e) => {
                error!(event = "AUTH_LOGOUT_FAILED", reason = %e, "session teardown failed");
                Err(e)
            }
        }
    }

    /// Log out, then send the client to `route`
    pub fn logout_and_redirect(&mut self, route: &str) -> AuthResult<Redirect> {
        self.logout()?;
        Ok(Redirect::to(route))
    }

    fn clear_session(&self) -> AuthResult<()> {
        self.session.unset(&self.config.session_key)?;
        self.session.destroy()?;
        self.session.regenerate_id(true)
    }

    /// Let the logged-in user rotate their password.
    ///
    /// Returns the new hash; storing it is up to the caller.
    pub fn password_change(
        &mut self,
        old: &str,
        new: &str,
        new_repeat: &str,
    ) -> AuthResult<String> {
        if !self.is_authenticated() {
            return self.fail(AuthError::NotAuthenticated);
        }

        if !compare_passwords(new, new_repeat) {
            return self.fail(AuthError::NewPasswordMismatch);
        }

        let old_matches = match self.ctx.current_user.as_ref() {
            Some(user) => self.verifier.passwords().verify(old, user.password_hash()),
            None => return self.fail(AuthError::NotAuthenticated),
        };
        if !old_matches {
            return self.fail(AuthError::OldPasswordMismatch);
        }

        match self.verifier.passwords().hash(new) {
            Ok(hash) => Ok(hash),
            Err(e) => self.fail(e),
        }
    }

    /// Hash a plaintext password with this engine's settings
    pub fn encode_password(&self, plain: &str) -> AuthResult<String> {
        self.verifier.passwords().hash(plain)
    }

    /// Whether the hydrated user's stored hash predates the current cost
    /// settings. Callers can rehash right after a successful login, while
    /// the plaintext is still at hand.
    pub fn needs_rehash(&self) -> bool {
        self.ctx
            .current_user
            .as_ref()
            .map(|u| self.verifier.passwords().needs_rehash(u.password_hash()))
            .unwrap_or(false)
    }
}
