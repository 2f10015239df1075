use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::services::vector::ChunkIndex;

/// One question/answer exchange. Appended to the session history, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEntry {
    pub question: String,
    pub answer: String,
    pub created_at: String,
}

/// Per-browser-session state: the password gate, the chat history and the
/// vector index built from the last processed upload. Held only in memory.
pub struct SessionContext {
    pub unlocked: bool,
    pub history: Vec<ChatEntry>,
    pub index: Option<Arc<ChunkIndex>>,
    last_seen: Instant,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            unlocked: false,
            history: Vec::new(),
            index: None,
            last_seen: Instant::now(),
        }
    }

    /// Compare the supplied password against the configured secret. A match
    /// unlocks the session; a mismatch leaves it locked and may be retried.
    pub fn unlock(&mut self, supplied: &str, configured: &str) -> bool {
        if supplied == configured {
            self.unlocked = true;
        }
        self.unlocked
    }

    pub fn push_entry(&mut self, question: String, answer: String) {
        self.history.push(ChatEntry {
            question,
            answer,
            created_at: chrono::Utc::now().to_rfc3339(),
        });
    }

    /// Replace any previously built index. History is unaffected.
    pub fn install_index(&mut self, index: ChunkIndex) {
        self.index = Some(Arc::new(index));
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory session map keyed by the session cookie. Idle sessions are pruned
/// lazily on request; nothing survives the process.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, SessionContext>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, SessionContext>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Create a fresh locked session and return its id.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.write().insert(id, SessionContext::new());
        id
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every session that has been idle for longer than the timeout.
    pub fn prune_expired(&self) {
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, ctx| ctx.last_seen.elapsed() < self.idle_timeout);
        let dropped = before - sessions.len();
        if dropped > 0 {
            tracing::debug!("Pruned {dropped} idle session(s)");
        }
    }

    /// Run `f` against the session's mutable context, refreshing its idle
    /// stamp. Returns `None` when the session no longer exists.
    pub fn with_session<T>(&self, id: Uuid, f: impl FnOnce(&mut SessionContext) -> T) -> Option<T> {
        let mut sessions = self.write();
        let ctx = sessions.get_mut(&id)?;
        ctx.last_seen = Instant::now();
        Some(f(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::vector::ChunkIndex;

    const PASSWORD: &str = "letmein";

    #[test]
    fn test_new_session_is_locked_and_empty() {
        let ctx = SessionContext::new();
        assert!(!ctx.unlocked);
        assert!(ctx.history.is_empty());
        assert!(ctx.index.is_none());
    }

    #[test]
    fn test_wrong_password_never_unlocks() {
        let mut ctx = SessionContext::new();
        for wrong in ["", "letmein ", "LETMEIN", "password", "letmei"] {
            assert!(!ctx.unlock(wrong, PASSWORD));
            assert!(!ctx.unlocked);
        }
    }

    #[test]
    fn test_correct_password_unlocks_even_after_failures() {
        let mut ctx = SessionContext::new();
        assert!(!ctx.unlock("nope", PASSWORD));
        assert!(ctx.unlock(PASSWORD, PASSWORD));
        assert!(ctx.unlocked);
        // Stays unlocked on subsequent checks
        assert!(ctx.unlock(PASSWORD, PASSWORD));
    }

    #[test]
    fn test_push_entry_appends_in_order() {
        let mut ctx = SessionContext::new();
        ctx.push_entry("first?".into(), "one".into());
        assert_eq!(ctx.history.len(), 1);
        ctx.push_entry("second?".into(), "two".into());
        assert_eq!(ctx.history.len(), 2);
        assert_eq!(ctx.history[0].question, "first?");
        assert_eq!(ctx.history[1].question, "second?");
        assert_eq!(ctx.history[1].answer, "two");
    }

    #[test]
    fn test_install_index_replaces_previous() {
        let mut ctx = SessionContext::new();

        let mut first = ChunkIndex::new(2);
        first.insert(vec![1.0, 0.0], "old".into()).unwrap();
        ctx.install_index(first);
        assert_eq!(ctx.index.as_ref().unwrap().len(), 1);

        let mut second = ChunkIndex::new(2);
        second.insert(vec![0.0, 1.0], "a".into()).unwrap();
        second.insert(vec![1.0, 1.0], "b".into()).unwrap();
        ctx.install_index(second);
        assert_eq!(ctx.index.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_store_create_and_lookup() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.is_empty());

        let id = store.create();
        assert!(store.contains(id));
        assert_eq!(store.len(), 1);
        assert!(!store.contains(Uuid::new_v4()));
    }

    #[test]
    fn test_with_session_mutates_in_place() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.create();

        store
            .with_session(id, |ctx| ctx.push_entry("q".into(), "a".into()))
            .unwrap();

        let len = store.with_session(id, |ctx| ctx.history.len()).unwrap();
        assert_eq!(len, 1);
        assert!(store.with_session(Uuid::new_v4(), |_| ()).is_none());
    }

    #[test]
    fn test_prune_expired_drops_idle_sessions() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.create();
        store.prune_expired();
        assert!(!store.contains(id));

        let keeper = SessionStore::new(Duration::from_secs(3600));
        let id = keeper.create();
        keeper.prune_expired();
        assert!(keeper.contains(id));
    }
}
