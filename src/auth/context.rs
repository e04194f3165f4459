//! Request Auth Context
//!
//! Hydrated identity, roles and permissions for one request. Never
//! persisted; the session only carries the user id.

use std::collections::HashSet;

use uuid::Uuid;

use super::errors::AuthError;
use super::user::{AuthUser, Permission, Role};

/// Authentication context
#[derive(Debug, Clone)]
pub struct AuthContext<U> {
    /// The hydrated user, if any
    pub current_user: Option<U>,

    /// Roles of `current_user`; empty when nobody is hydrated
    pub roles: HashSet<Role>,

    /// Permissions of `current_user`; empty when nobody is hydrated
    pub permissions: HashSet<Permission>,

    /// Most recent expected failure
    pub last_error: Option<AuthError>,
}

impl<U> Default for AuthContext<U> {
    fn default() -> Self {
        Self {
            current_user: None,
            roles: HashSet::new(),
            permissions: HashSet::new(),
            last_error: None,
        }
    }
}

impl<U: AuthUser> AuthContext<U> {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `user` and pull whatever roles/permissions it can report.
    pub fn hydrate(&mut self, user: U) {
        self.roles = user.roles().unwrap_or_default();
        self.permissions = user.permissions().unwrap_or_default();
        self.current_user = Some(user);
    }

    /// Drop the identity along with everything derived from it.
    /// `last_error` survives so callers can still report it.
    pub fn clear_identity(&mut self) {
        self.current_user = None;
        self.roles.clear();
        self.permissions.clear();
    }

    /// Back to a fresh context
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// ID of the hydrated user
    pub fn user_id(&self) -> Option<Uuid> {
        self.current_user.as_ref().map(|u| u.id())
    }

    /// Whether the hydrated user matches `id`
    pub fn is_hydrated_for(&self, id: Uuid) -> bool {
        self.user_id() == Some(id)
    }

    pub fn is_superuser(&self) -> bool {
        self.current_user
            .as_ref()
            .map(|u| u.is_superuser())
            .unwrap_or(false)
    }
}
