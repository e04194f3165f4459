//! # Cryptographic Utilities
//!
//! Password hashing, verification and secure token generation.
//!
//! ## Invariants
//! - Passwords only stored as Argon2id PHC strings (algorithm, params and
//!   salt embedded)
//! - Fresh random salt per hash
//! - Constant-time comparison for all secrets
//! - Plaintext never outlives the call that received it

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version, ARGON2ID_IDENT,
};
use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::{error, warn};
use zeroize::Zeroizing;

use super::config::PasswordConfig;
use super::errors::{AuthError, AuthResult};

/// Hashes, verifies and rotates passwords.
///
/// Cheap to clone; clones are moved onto tokio's blocking pool by the
/// `*_offloaded` methods.
#[derive(Debug, Clone)]
pub struct PasswordManager {
    params: Params,
    verify_timeout: Duration,
    /// Burned by `verify_dummy`; filled on first use, shared by clones
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl PasswordManager {
    /// Build a manager from configured Argon2id cost parameters
    pub fn new(config: &PasswordConfig) -> AuthResult<Self> {
        config.validate()?;
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::ConfigError(format!("argon2 params: {}", e)))?;

        Ok(Self {
            params,
            verify_timeout: Duration::from_millis(config.verify_timeout_ms),
            dummy_hash: Arc::new(OnceLock::new()),
        })
    }

    /// Override the off-loaded verification timeout
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password using Argon2id with a fresh salt
    pub fn hash(&self, plain: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(event = "AUTH_HASH_FAILED", reason = %e, "password hashing failed");
                AuthError::HashingFailed
            })
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// Uses the algorithm and params embedded in `hash`, not the configured
    /// ones. Comparison is constant-time (via argon2 crate). A malformed
    /// hash never verifies.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(event = "AUTH_MALFORMED_HASH", reason = %e, "stored hash is not a PHC string");
                return false;
            }
        };

        self.argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    /// A throwaway PHC hash with the configured params, computed once.
    ///
    /// `None` only if hashing itself is broken.
    pub fn dummy_hash(&self) -> Option<&str> {
        self.dummy_hash
            .get_or_init(|| self.hash(&generate_token()).ok())
            .as_deref()
    }

    #[cfg(test)]
    pub(crate) fn dummy_hash_computed(&self) -> bool {
        self.dummy_hash.get().is_some()
    }

    /// Spend one verification's worth of work and reject.
    ///
    /// Called when a username is unknown so the miss takes as long as a
    /// wrong password.
    pub fn verify_dummy(&self, plain: &str) -> bool {
        if let Some(hash) = self.dummy_hash() {
            // Random secret; never matches
            let _ = self.verify(plain, hash);
        }
        false
    }

    /// Whether a stored hash was produced with weaker or different settings
    /// than the ones configured now. Unparseable hashes always need rehashing.
    pub fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return true;
        };
        if parsed.algorithm != ARGON2ID_IDENT {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(stored) => {
                stored.m_cost() != self.params.m_cost()
                    || stored.t_cost() != self.params.t_cost()
                    || stored.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }

    /// Hash on tokio's blocking pool so the runtime keeps serving
    /// other requests.
    pub async fn hash_offloaded(&self, plain: Zeroizing<String>) -> AuthResult<String> {
        let manager = self.clone();
        tokio::task::spawn_blocking(move || manager.hash(&plain))
            .await
            .map_err(|e| AuthError::InternalError(format!("hash worker failed: {}", e)))?
    }

    /// Verify on tokio's blocking pool, bounded by the configured timeout.
    ///
    /// A timeout or worker failure is an `InternalError`, never a verdict.
    pub async fn verify_offloaded(
        &self,
        plain: Zeroizing<String>,
        hash: String,
    ) -> AuthResult<bool> {
        let manager = self.clone();
        let task = tokio::task::spawn_blocking(move || manager.verify(&plain, &hash));

        match tokio::time::timeout(self.verify_timeout, task).await {
            Ok(Ok(verified)) => Ok(verified),
            Ok(Err(e)) => Err(AuthError::InternalError(format!(
                "verify worker failed: {}",
                e
            ))),
            Err(_) => {
                error!(
                    event = "AUTH_VERIFY_TIMEOUT",
                    timeout_ms = self.verify_timeout.as_millis() as u64,
                    "password verification timed out"
                );
                Err(AuthError::InternalError(
                    "password verification timed out".to_string(),
                ))
            }
        }
    }
}

/// Strict comparison of two plaintext passwords.
///
/// Constant-time for equal lengths; differing lengths never match.
pub fn compare_passwords(a: &str, b: &str) -> bool {
    constant_time_str_eq(a, b)
}

/// Generate a cryptographically secure random token
///
/// Returns a 256-bit (32-byte) random value as base64.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Constant-time comparison of two byte slices
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Constant-time comparison of two strings
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
pub(crate) fn test_manager() -> PasswordManager {
    PasswordManager::new(&PasswordConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
        verify_timeout_ms: 5000,
    })
    .unwrap()
}
