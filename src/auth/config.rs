//! Auth Configuration
//!
//! Session key, redirect routes and Argon2 cost parameters.
//! Loaded from a JSON file; every field has a default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{AuthError, AuthResult};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session key holding the logged-in user id (default: "logged_in")
    #[serde(default = "default_session_key")]
    pub session_key: String,

    /// Where `require_login` sends anonymous users (default: "login")
    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// Where `require_perm` sends users lacking a permission
    /// (default: "unauthorized-access")
    #[serde(default = "default_unauthorized_route")]
    pub unauthorized_route: String,

    /// Password hashing parameters
    #[serde(default)]
    pub password: PasswordConfig,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 19456, the OWASP baseline)
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    /// Number of passes (default: 2)
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Degree of parallelism (default: 1)
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,

    /// Upper bound for an off-loaded verification (default: 5000ms)
    #[serde(default = "default_verify_timeout_ms")]
    pub verify_timeout_ms: u64,
}

fn default_session_key() -> String {
    "logged_in".to_string()
}

fn default_login_route() -> String {
    "login".to_string()
}

fn default_unauthorized_route() -> String {
    "unauthorized-access".to_string()
}

fn default_memory_kib() -> u32 {
    19456
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

fn default_verify_timeout_ms() -> u64 {
    5000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_key: default_session_key(),
            login_route: default_login_route(),
            unauthorized_route: default_unauthorized_route(),
            password: PasswordConfig::default(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
            verify_timeout_ms: default_verify_timeout_ms(),
        }
    }
}

impl AuthConfig {
    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AuthError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a JSON config document
    pub fn from_json_str(raw: &str) -> AuthResult<Self> {
        let config: AuthConfig =
            serde_json::from_str(raw).map_err(|e| AuthError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> AuthResult<()> {
        if self.session_key.trim().is_empty() {
            return Err(AuthError::ConfigError("session_key must not be empty".into()));
        }
        if self.login_route.trim().is_empty() {
            return Err(AuthError::ConfigError("login_route must not be empty".into()));
        }
        if self.unauthorized_route.trim().is_empty() {
            return Err(AuthError::ConfigError(
                "unauthorized_route must not be empty".into(),
            ));
        }
        self.password.validate()
    }
}

impl PasswordConfig {
    /// Reject zero cost parameters
    pub fn validate(&self) -> AuthResult<()> {
        if self.memory_kib == 0 || self.iterations == 0 || self.parallelism == 0 {
            return Err(AuthError::ConfigError(
                "argon2 memory_kib, iterations and parallelism must be non-zero".into(),
            ));
        }
        if self.verify_timeout_ms == 0 {
            return Err(AuthError::ConfigError(
                "verify_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.session_key, "logged_in");
        assert_eq!(config.login_route, "login");
        assert_eq!(config.unauthorized_route, "unauthorized-access");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AuthConfig::from_json_str(r#"{"login_route": "signin"}"#).unwrap();
        assert_eq!(config.login_route, "signin");
        assert_eq!(config.session_key, "logged_in");
        assert_eq!(config.password, PasswordConfig::default());
    }

    #[test]
    fn test_empty_route_rejected() {
        let result = AuthConfig::from_json_str(r#"{"unauthorized_route": "  "}"#);
        assert!(matches!(result, Err(AuthError::ConfigError(_))));
    }

    #[test]
    fn test_zero_cost_rejected() {
        let result = AuthConfig::from_json_str(r#"{"password": {"iterations": 0}}"#);
        assert!(matches!(result, Err(AuthError::ConfigError(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = AuthConfig::from_json_str("{not json");
        assert!(matches!(result, Err(AuthError::ConfigError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"session_key": "uid", "password": {{"memory_kib": 64, "iterations": 1}}}}"#
        )
        .unwrap();

        let config = AuthConfig::load(file.path()).unwrap();
        assert_eq!(config.session_key, "uid");
        assert_eq!(config.password.memory_kib, 64);
        assert_eq!(config.password.parallelism, 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AuthConfig::load("/nonexistent/aeroauth.json");
        assert!(matches!(result, Err(AuthError::ConfigError(_))));
    }
}
