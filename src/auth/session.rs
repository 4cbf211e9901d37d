//! Authenticated identity for the running process.
//!
//! A `SessionContext` is created once by the host and handed to whatever
//! needs to know who is logged in. Login begins a session, logout ends it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// The identity established by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub started_at: DateTime<Utc>,
}

/// Shared holder for the current session, if any.
#[derive(Debug, Default)]
pub struct SessionContext {
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `username`, replacing any previous one.
    pub fn begin(&self, username: &str) -> Session {
        let session = Session {
            username: username.to_string(),
            started_at: Utc::now(),
        };
        let previous = self.current.write().replace(session.clone());
        if let Some(previous) = previous {
            tracing::debug!(user = %previous.username, "Replacing existing session");
        }
        tracing::info!(user = %session.username, "Session started");
        session
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn username(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.username.clone())
    }

    pub fn is_active(&self) -> bool {
        self.current.read().is_some()
    }

    /// Clear the session and return what was there.
    pub fn end(&self) -> Option<Session> {
        let ended = self.current.write().take();
        if let Some(ref session) = ended {
            tracing::info!(user = %session.username, "Session ended");
        }
        ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_empty() {
        let ctx = SessionContext::new();
        assert!(!ctx.is_active());
        assert!(ctx.current().is_none());
        assert!(ctx.username().is_none());
    }

    #[test]
    fn begin_and_end() {
        let ctx = SessionContext::new();
        let session = ctx.begin("alice");
        assert_eq!(session.username, "alice");
        assert!(ctx.is_active());
        assert_eq!(ctx.username().as_deref(), Some("alice"));
        assert_eq!(ctx.current(), Some(session.clone()));

        assert_eq!(ctx.end(), Some(session));
        assert!(!ctx.is_active());
        assert!(ctx.end().is_none());
    }

    #[test]
    fn begin_replaces_previous() {
        let ctx = SessionContext::new();
        let first = ctx.begin("alice");
        let second = ctx.begin("bob");
        assert_eq!(ctx.username().as_deref(), Some("bob"));
        assert!(second.started_at >= first.started_at);
    }

    #[test]
    fn shared_across_threads() {
        let ctx = Arc::new(SessionContext::new());
        let writer = Arc::clone(&ctx);
        std::thread::spawn(move || {
            writer.begin("carol");
        })
        .join()
        .unwrap();
        assert_eq!(ctx.username().as_deref(), Some("carol"));
    }
}
