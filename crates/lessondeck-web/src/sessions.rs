//! In-memory session store keyed by a cookie
//!
//! Sessions live only as long as the process and are dropped after a period
//! without requests. Each one sits behind its own async mutex so a user's
//! actions run one at a time.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use lessondeck_core::{DeckError, Session};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "lessondeck_session";

/// One-shot message shown on the next page render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Info,
    Warning,
    Error,
}

impl Flash {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Warning,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn error(err: &DeckError) -> Self {
        Self {
            kind: FlashKind::Error,
            message: err.to_string(),
            suggestion: err.suggestion(),
        }
    }
}

/// Flow session plus UI-only state
#[derive(Debug, Default)]
pub struct WebSession {
    pub flow: Session,
    pub flash: Option<Flash>,
}

pub type SharedSession = Arc<Mutex<WebSession>>;

/// Idle time after which a session is dropped unless configured otherwise
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(2 * 60 * 60);

/// Upper bound on live sessions; the least recently used go first
const MAX_SESSIONS: u64 = 10_000;

pub struct SessionStore {
    sessions: Cache<String, SharedSession>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE)
    }

    /// Store whose sessions expire `idle` after their last request
    pub fn with_idle_timeout(idle: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(idle)
            .eviction_listener(|id: Arc<String>, _, cause| {
                tracing::debug!("Session {} dropped ({:?})", id, cause);
            })
            .build();
        Self { sessions }
    }

    /// Session for `id`, or a fresh one under a new id
    pub fn get_or_create(&self, id: Option<&str>) -> (String, SharedSession) {
        if let Some(id) = id {
            if let Some(session) = self.sessions.get(id) {
                return (id.to_string(), session);
            }
        }

        let id = Uuid::new_v4().simple().to_string();
        let session = SharedSession::default();
        self.sessions.insert(id.clone(), Arc::clone(&session));
        tracing::debug!("New session {}", id);
        (id, session)
    }

    /// Replace the session under `id` with a fresh one
    pub fn reset(&self, id: &str) {
        self.sessions.insert(id.to_string(), SharedSession::default());
    }

    /// Live sessions, after expired ones are swept
    pub fn len(&self) -> usize {
        self.sessions.run_pending_tasks();
        usize::try_from(self.sessions.entry_count()).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Session id from the request's `Cookie` header
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for `id`
pub fn session_cookie(id: &str) -> HeaderValue {
    // Ids are hex uuids, always a valid header value
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("lessondeck_session=; Path=/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; lessondeck_session=abc123; other=1"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));

        let empty = HeaderMap::new();
        assert_eq!(session_id(&empty), None);
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_known_ids() {
        let store = SessionStore::new();
        let (id, first) = store.get_or_create(None);
        let (same_id, second) = store.get_or_create(Some(&id));
        assert_eq!(id, same_id);
        assert!(Arc::ptr_eq(&first, &second));

        let (other, _) = store.get_or_create(Some("unknown"));
        assert_ne!(other, "unknown");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_replaces_session() {
        let store = SessionStore::new();
        let (id, session) = store.get_or_create(None);
        session.lock().await.flash = Some(Flash::info("hello"));

        store.reset(&id);
        let (_, fresh) = store.get_or_create(Some(&id));
        assert!(fresh.lock().await.flash.is_none());
    }

    #[tokio::test]
    async fn test_idle_session_is_evicted() {
        let store = SessionStore::with_idle_timeout(Duration::from_millis(50));
        let (id, stale) = store.get_or_create(None);
        stale.lock().await.flash = Some(Flash::info("hello"));
        assert_eq!(store.len(), 1);

        // The cache keeps its own clock, so this has to be a real wait
        std::thread::sleep(Duration::from_millis(150));
        assert!(store.is_empty());

        let (new_id, fresh) = store.get_or_create(Some(&id));
        assert_ne!(new_id, id);
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(fresh.lock().await.flash.is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_active_session_survives() {
        let store = SessionStore::with_idle_timeout(Duration::from_millis(300));
        let (id, first) = store.get_or_create(None);

        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(120));
            let (same, session) = store.get_or_create(Some(&id));
            assert_eq!(same, id);
            assert!(Arc::ptr_eq(&first, &session));
        }
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc");
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("lessondeck_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
    }
}
