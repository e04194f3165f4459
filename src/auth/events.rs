//! Auth Events
//!
//! Login/logout signals published to an [`EventSink`]. The engine always
//! holds a sink; [`NoopEventSink`] is the default.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::context::AuthContext;
use super::user::AuthUser;

/// Signals emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthEvent {
    /// Credentials accepted, session bound
    LoginSuccess,
    /// Logout requested, session still intact
    BeforeLogout,
    /// Session torn down
    LogoutSuccess,
}

impl AuthEvent {
    /// Returns the signal name
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::LoginSuccess => "auth.login_success",
            AuthEvent::BeforeLogout => "auth.before_logout",
            AuthEvent::LogoutSuccess => "auth.logout_success",
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the request's [`AuthContext`] at publish time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthEventPayload {
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
    pub at: DateTime<Utc>,
}

impl AuthEventPayload {
    pub fn from_context<U: AuthUser>(ctx: &AuthContext<U>) -> Self {
        Self {
            user_id: ctx.current_user.as_ref().map(|u| u.id()),
            username: ctx.current_user.as_ref().map(|u| u.username().to_string()),
            roles: ctx.roles.iter().cloned().collect(),
            permissions: ctx.permissions.iter().cloned().collect(),
            at: Utc::now(),
        }
    }
}

/// Receiver for auth signals.
///
/// Fire-and-forget: the engine ignores whatever a sink does with the event.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AuthEvent, payload: &AuthEventPayload);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: AuthEvent, _payload: &AuthEventPayload) {}
}

/// Emits events as structured log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn publish(&self, event: AuthEvent, payload: &AuthEventPayload) {
        tracing::info!(
            event = event.as_str(),
            user_id = ?payload.user_id,
            username = payload.username.as_deref().unwrap_or(""),
            "auth signal"
        );
    }
}

/// In-memory sink for testing.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<(AuthEvent, AuthEventPayload)>>,
}

impl MemoryEventSink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events in publish order.
    pub fn events(&self) -> Vec<(AuthEvent, AuthEventPayload)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Event kinds only, in publish order.
    pub fn kinds(&self) -> Vec<AuthEvent> {
        self.events().into_iter().map(|(event, _)| event).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn publish(&self, event: AuthEvent, payload: &AuthEventPayload) {
        if let Ok(mut events) = self.events.lock() {
            events.push((event, payload.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user::User;

    #[test]
    fn test_event_names() {
        assert_eq!(AuthEvent::LoginSuccess.as_str(), "auth.login_success");
        assert_eq!(AuthEvent::BeforeLogout.to_string(), "auth.before_logout");
        assert_eq!(AuthEvent::LogoutSuccess.as_str(), "auth.logout_success");
    }

    #[test]
    fn test_payload_snapshot() {
        let mut ctx = AuthContext::new();
        let user = User::new("alice", "h").with_roles(["editor"]);
        let id = user.id;
        ctx.hydrate(user);

        let payload = AuthEventPayload::from_context(&ctx);
        assert_eq!(payload.user_id, Some(id));
        assert_eq!(payload.username.as_deref(), Some("alice"));
        assert!(payload.roles.contains("editor"));
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemoryEventSink::new();
        let payload = AuthEventPayload::from_context(&AuthContext::<User>::new());

        sink.publish(AuthEvent::BeforeLogout, &payload);
        sink.publish(AuthEvent::LogoutSuccess, &payload);

        assert_eq!(
            sink.kinds(),
            vec![AuthEvent::BeforeLogout, AuthEvent::LogoutSuccess]
        );
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_sink_emits_signal() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mut ctx = AuthContext::new();
        ctx.hydrate(User::new("alice", "$argon2id$secret"));
        let payload = AuthEventPayload::from_context(&ctx);

        tracing::subscriber::with_default(subscriber, || {
            LogEventSink.publish(AuthEvent::LoginSuccess, &payload);
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("auth.login_success"));
        assert!(output.contains("alice"));
        assert!(!output.contains("secret"));
    }

    #[test]
    fn test_payload_serializes_without_secrets() {
        let mut ctx = AuthContext::new();
        ctx.hydrate(User::new("alice", "$argon2id$secret"));

        let json = serde_json::to_string(&AuthEventPayload::from_context(&ctx)).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("secret"));
    }
}
