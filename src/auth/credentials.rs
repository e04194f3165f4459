//! Credential Verification
//!
//! Username/password check against the user store and account state.
//! Works without a session, e.g. for API clients that authenticate every
//! request.

use std::marker::PhantomData;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::crypto::PasswordManager;
use super::errors::{AuthError, AuthResult};
use super::user::{AuthUser, UserStore};

/// Validates credentials against a [`UserStore`]
pub struct CredentialVerifier<U, R> {
    users: R,
    passwords: PasswordManager,
    _user: PhantomData<fn() -> U>,
}

impl<U: AuthUser, R: UserStore<U>> CredentialVerifier<U, R> {
    pub fn new(users: R, passwords: PasswordManager) -> Self {
        Self {
            users,
            passwords,
            _user: PhantomData,
        }
    }

    /// Swap the password manager, keeping the store
    pub fn with_passwords(self, passwords: PasswordManager) -> Self {
        Self { passwords, ..self }
    }

    pub fn users(&self) -> &R {
        &self.users
    }

    pub fn passwords(&self) -> &PasswordManager {
        &self.passwords
    }

    /// Return the user iff it exists, the password verifies and the
    /// account is active.
    ///
    /// Unknown username and wrong password both yield
    /// `InvalidCredentials`, and a miss still pays for one Argon2
    /// verification so the two take the same time. `InactiveAccount` is
    /// only reported once the password has verified, so it never confirms
    /// an account to someone without its password.
    pub fn authorize(&self, username: &str, password: &str) -> AuthResult<U> {
        let user = self.users.find_by_username(username)?;
        let verified = match &user {
            Some(user) => self.passwords.verify(password, user.password_hash()),
            None => self.passwords.verify_dummy(password),
        };
        self.decide(user, verified)
    }

    /// [`CredentialVerifier::authorize`] with the Argon2 work moved onto
    /// tokio's blocking pool. A verification timeout is an
    /// `InternalError`, not a rejection.
    pub async fn authorize_offloaded(
        &self,
        username: &str,
        password: Zeroizing<String>,
    ) -> AuthResult<U> {
        let user = self.users.find_by_username(username)?;
        let hash = match &user {
            Some(user) => Some(user.password_hash().to_string()),
            None => self.passwords.dummy_hash().map(str::to_string),
        };

        let verified = match hash {
            Some(hash) => self.passwords.verify_offloaded(password, hash).await?,
            None => false,
        };
        self.decide(user, verified)
    }

    /// Outcome of a lookup plus verification, shared by both paths.
    fn decide(&self, user: Option<U>, verified: bool) -> AuthResult<U> {
        let user = match user {
            Some(user) => user,
            None => {
                debug!(event = "AUTH_UNKNOWN_USERNAME", "credential check rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verified {
            debug!(event = "AUTH_PASSWORD_MISMATCH", user_id = %user.id(), "credential check rejected");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active() {
            warn!(event = "AUTH_INACTIVE_ACCOUNT", user_id = %user.id(), "login to inactive account");
            return Err(AuthError::InactiveAccount);
        }

        Ok(user)
    }
}
