//! # User Management
//!
//! The identity the engine authenticates, and the store it reads from.
//!
//! Any user type can plug in by implementing [`AuthUser`]. Role and
//! permission retrieval are optional capabilities: a type that does not
//! override them simply hydrates with empty sets.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{AuthError, AuthResult};

/// Opaque role tag
pub type Role = String;

/// Opaque permission tag
pub type Permission = String;

/// What the engine needs to know about an account.
pub trait AuthUser: Clone + Send + Sync {
    /// Stable identifier stored in the session
    fn id(&self) -> Uuid;

    /// Unique login name
    fn username(&self) -> &str;

    /// Stored PHC hash
    fn password_hash(&self) -> &str;

    /// Disabled accounts cannot log in
    fn is_active(&self) -> bool;

    /// Superusers pass every permission check
    fn is_superuser(&self) -> bool;

    /// Roles held by this user, if the type can answer
    fn roles(&self) -> Option<HashSet<Role>> {
        None
    }

    /// Permissions held by this user, if the type can answer
    fn permissions(&self) -> Option<HashSet<Permission>> {
        None
    }
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// Login name (unique)
    pub username: String,

    /// Argon2id password hash (never plaintext)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Whether the account may log in
    pub active: bool,

    /// Bypasses permission checks
    #[serde(default)]
    pub is_superuser: bool,

    #[serde(default)]
    pub roles: HashSet<Role>,

    #[serde(default)]
    pub permissions: HashSet<Permission>,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create an active, non-superuser account from an existing hash
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            active: true,
            is_superuser: false,
            roles: HashSet::new(),
            permissions: HashSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Role>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Permission>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Replace the stored hash, e.g. after `password_change`
    pub fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
        self.updated_at = Utc::now();
    }
}

impl AuthUser for User {
    fn id(&self) -> Uuid {
        self.id
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    fn roles(&self) -> Option<HashSet<Role>> {
        Some(self.roles.clone())
    }

    fn permissions(&self) -> Option<HashSet<Permission>> {
        Some(self.permissions.clone())
    }
}

/// User store trait
///
/// Read side of the persistent user store. A miss is `Ok(None)`;
/// `Err` is reserved for storage failures.
pub trait UserStore<U: AuthUser>: Send + Sync {
    /// Find a user by their login name
    fn find_by_username(&self, username: &str) -> AuthResult<Option<U>>;

    /// Find a user by their ID
    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<U>>;
}

/// In-memory user store for testing and embedding
#[derive(Debug)]
pub struct InMemoryUserStore<U: AuthUser = User> {
    users: std::sync::RwLock<Vec<U>>,
}

impl<U: AuthUser> Default for InMemoryUserStore<U> {
    fn default() -> Self {
        Self {
            users: std::sync::RwLock::new(Vec::new()),
        }
    }
}

impl<U: AuthUser> InMemoryUserStore<U> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user; usernames must be unique
    pub fn insert(&self, user: U) -> AuthResult<()> {
        let mut users = self.users.write().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;

        if users.iter().any(|u| u.username() == user.username()) {
            return Err(AuthError::StorageError(format!(
                "username already taken: {}",
                user.username()
            )));
        }

        users.push(user);
        Ok(())
    }

    /// Replace an existing user matched by id
    pub fn update(&self, user: U) -> AuthResult<()> {
        let mut users = self.users.write().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;

        if let Some(existing) = users.iter_mut().find(|u| u.id() == user.id()) {
            *existing = user;
            Ok(())
        } else {
            Err(AuthError::StorageError("User not found".to_string()))
        }
    }

    /// Remove a user by id
    pub fn delete(&self, id: Uuid) -> AuthResult<()> {
        let mut users = self.users.write().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;

        let len_before = users.len();
        users.retain(|u| u.id() != id);

        if users.len() == len_before {
            Err(AuthError::StorageError("User not found".to_string()))
        } else {
            Ok(())
        }
    }
}

impl<U: AuthUser> UserStore<U> for InMemoryUserStore<U> {
    fn find_by_username(&self, username: &str) -> AuthResult<Option<U>> {
        let users = self.users.read().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;
        Ok(users.iter().find(|u| u.username() == username).cloned())
    }

    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<U>> {
        let users = self.users.read().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;
        Ok(users.iter().find(|u| u.id() == id).cloned())
    }
}

impl<U: AuthUser, S: UserStore<U> + ?Sized> UserStore<U> for std::sync::Arc<S> {
    fn find_by_username(&self, username: &str) -> AuthResult<Option<U>> {
        (**self).find_by_username(username)
    }

    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<U>> {
        (**self).find_by_id(id)
    }
}
