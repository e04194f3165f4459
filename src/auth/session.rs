//! # Session Management
//!
//! Key-value session store the engine reads and writes through.
//!
//! ## Invariants
//! - Login regenerates the session id before the user id is written
//! - Logout destroys the session and regenerates its id
//! - A regenerated-away id no longer resolves to any data

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::crypto::generate_token;
use super::errors::{AuthError, AuthResult};

/// Session store bound to the current request's session.
///
/// Every mutation goes through this trait; the engine never touches
/// session state any other way.
pub trait SessionStore: Send + Sync {
    /// Current session id
    fn id(&self) -> AuthResult<String>;

    /// Read a value, `None` when unset
    fn read(&self, key: &str) -> AuthResult<Option<String>>;

    /// Write a value
    fn write(&self, key: &str, value: &str) -> AuthResult<()>;

    /// Remove a value; removing an absent key is not an error
    fn unset(&self, key: &str) -> AuthResult<()>;

    /// Move the session data to a fresh id. With `destroy_old` the old id
    /// stops resolving immediately.
    fn regenerate_id(&self, destroy_old: bool) -> AuthResult<()>;

    /// Drop all data held under the current id
    fn destroy(&self) -> AuthResult<()>;
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn id(&self) -> AuthResult<String> {
        (**self).id()
    }

    fn read(&self, key: &str) -> AuthResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> AuthResult<()> {
        (**self).write(key, value)
    }

    fn unset(&self, key: &str) -> AuthResult<()> {
        (**self).unset(key)
    }

    fn regenerate_id(&self, destroy_old: bool) -> AuthResult<()> {
        (**self).regenerate_id(destroy_old)
    }

    fn destroy(&self) -> AuthResult<()> {
        (**self).destroy()
    }
}

type SessionData = HashMap<String, String>;

fn poisoned<T>(_: T) -> AuthError {
    AuthError::StorageError("Lock poisoned".to_string())
}

/// Shared in-memory session backend, keyed by session id
#[derive(Debug, Default)]
pub struct MemorySessionBackend {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl MemorySessionBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open a handle for one request.
    ///
    /// `id` is whatever the client presented (e.g. a cookie). Unknown or
    /// missing ids get an empty session; a client-chosen id is kept until
    /// login regenerates it.
    pub fn open(self: &Arc<Self>, id: Option<&str>) -> MemorySession {
        let id = id.map(str::to_string).unwrap_or_else(generate_token);
        MemorySession {
            backend: Arc::clone(self),
            id: RwLock::new(id),
        }
    }

    /// Whether any data is stored under `id`
    pub fn contains(&self, id: &str) -> AuthResult<bool> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.contains_key(id))
    }

    /// Number of live sessions
    pub fn len(&self) -> AuthResult<usize> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.len())
    }

    pub fn is_empty(&self) -> AuthResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Per-request handle onto a [`MemorySessionBackend`]
#[derive(Debug)]
pub struct MemorySession {
    backend: Arc<MemorySessionBackend>,
    id: RwLock<String>,
}

impl MemorySession {
    fn current_id(&self) -> AuthResult<String> {
        Ok(self.id.read().map_err(poisoned)?.clone())
    }
}

impl SessionStore for MemorySession {
    fn id(&self) -> AuthResult<String> {
        self.current_id()
    }

    fn read(&self, key: &str) -> AuthResult<Option<String>> {
        let id = self.current_id()?;
        let sessions = self.backend.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(&id).and_then(|data| data.get(key)).cloned())
    }

    fn write(&self, key: &str, value: &str) -> AuthResult<()> {
        let id = self.current_id()?;
        let mut sessions = self.backend.sessions.write().map_err(poisoned)?;
        sessions
            .entry(id)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn unset(&self, key: &str) -> AuthResult<()> {
        let id = self.current_id()?;
        let mut sessions = self.backend.sessions.write().map_err(poisoned)?;
        if let Some(data) = sessions.get_mut(&id) {
            data.remove(key);
        }
        Ok(())
    }

    fn regenerate_id(&self, destroy_old: bool) -> AuthResult<()> {
        let mut id = self.id.write().map_err(poisoned)?;
        let new_id = generate_token();

        // Single write lock so no reader observes both ids live
        let mut sessions = self.backend.sessions.write().map_err(poisoned)?;
        let data = if destroy_old {
            sessions.remove(id.as_str())
        } else {
            sessions.get(id.as_str()).cloned()
        };
        if let Some(data) = data {
            sessions.insert(new_id.clone(), data);
        }

        *id = new_id;
        Ok(())
    }

    fn destroy(&self) -> AuthResult<()> {
        let id = self.current_id()?;
        let mut sessions = self.backend.sessions.write().map_err(poisoned)?;
        sessions.remove(&id);
        Ok(())
    }
}
