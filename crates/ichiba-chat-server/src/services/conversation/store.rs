use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use crate::models::chat::SessionId;
use super::types::SessionState;

/// Shared handle to one session. Held locked for a whole submission, so
/// submissions to the same session never interleave.
pub type SessionHandle = Arc<Mutex<SessionState>>;

#[derive(Clone)]
struct SessionEntry {
    last_access: Instant,
    state: SessionHandle,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            last_access: Instant::now(),
            state: Arc::new(Mutex::new(SessionState::new())),
        }
    }

    /// Idle longer than `ttl` and not held by a running submission
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_access.elapsed() > ttl && self.state.try_lock().is_ok()
    }
}

/// Thread-safe in-memory session store
/// Uses DashMap for lock-free concurrent access
#[derive(Clone)]
pub struct SessionStore {
    /// Session storage: session_id -> state
    storage: Arc<DashMap<SessionId, SessionEntry>>,

    /// Idle lifetime of a session, counted from its last access
    ttl: Duration,
}

impl SessionStore {
    /// Create new store instance
    pub fn new(ttl: Duration) -> Self {
        info!("Initializing session store with DashMap (ttl: {:?})", ttl);
        Self {
            storage: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Get session by id and refresh its last access
    /// Returns None if not found or expired
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        match self.storage.get_mut(session_id) {
            None => return None,
            Some(mut entry) => {
                if !entry.is_expired(self.ttl) {
                    entry.last_access = Instant::now();
                    return Some(entry.state.clone());
                }
            }
        }

        // Shard guard is released here. Re-check under the removal lock so a
        // session recreated in between is left alone.
        if self
            .storage
            .remove_if(session_id, |_, entry| entry.is_expired(self.ttl))
            .is_some()
        {
            debug!("Session {} expired, removed from store", session_id);
        }
        None
    }

    /// Get a live session or start a fresh one under the same id
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(state) = self.get(session_id) {
            return state;
        }

        let entry = self
            .storage
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!("Created session {}", session_id);
                SessionEntry::new()
            });

        entry.state.clone()
    }

    /// Refresh the last access of a live session
    pub fn touch(&self, session_id: &str) {
        if let Some(mut entry) = self.storage.get_mut(session_id) {
            entry.last_access = Instant::now();
        }
    }

    /// End a session and discard its state
    pub fn remove(&self, session_id: &str) -> bool {
        self.storage.remove(session_id).is_some()
    }

    /// Get number of active sessions
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Cleanup expired sessions
    /// Returns number of sessions removed
    pub fn cleanup_expired(&self) -> usize {
        let start_len = self.storage.len();
        let ttl = self.ttl;
        self.storage.retain(|_, entry| !entry.is_expired(ttl));
        let end_len = self.storage.len();

        let count = start_len.saturating_sub(end_len);

        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Turn;

    #[tokio::test]
    async fn test_store_basic_operations() {
        let store = SessionStore::new(Duration::from_secs(60));

        let handle = store.get_or_create("s-1");
        handle.lock().await.append(Turn::user("hello"));
        assert_eq!(store.len(), 1);

        // Same id returns the same state
        let again = store.get("s-1").unwrap();
        assert_eq!(again.lock().await.all().len(), 1);

        assert!(store.remove("s-1"));
        assert!(!store.remove("s-1"));
        assert!(store.is_empty());
        assert!(store.get("s-1").is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let store = SessionStore::new(Duration::from_millis(1));

        let handle = store.get_or_create("s-1");
        handle.lock().await.set_last_topic("加湿器");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.get("s-1").is_none());

        let fresh = store.get_or_create("s-1");
        assert_eq!(fresh.lock().await.last_topic(), "なし");
    }

    #[tokio::test]
    async fn test_access_extends_lifetime() {
        let store = SessionStore::new(Duration::from_millis(50));
        store.get_or_create("s-1");

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(store.get("s-1").is_some());
        }
        assert_eq!(store.cleanup_expired(), 0);
    }

    #[tokio::test]
    async fn test_locked_session_is_never_evicted() {
        let store = SessionStore::new(Duration::from_millis(1));
        let handle = store.get_or_create("s-1");
        let guard = handle.lock().await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.cleanup_expired(), 0);

        let same = store.get("s-1").unwrap();
        assert!(Arc::ptr_eq(&same, &handle));
        drop(guard);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.cleanup_expired(), 1);
    }

    #[tokio::test]
    async fn test_expired_lookup_keeps_recreated_session() {
        let store = SessionStore::new(Duration::from_millis(200));
        let stale = store.get_or_create("s-1");
        store.storage.alter("s-1", |_, mut entry| {
            entry.last_access = Instant::now() - Duration::from_secs(1);
            entry
        });

        // Another caller replaced the stale entry before this lookup ran
        store.storage.insert("s-1".to_string(), SessionEntry::new());
        let fresh = store.storage.get("s-1").unwrap().state.clone();

        let got = store.get("s-1").unwrap();
        assert!(Arc::ptr_eq(&got, &fresh));
        assert!(!Arc::ptr_eq(&got, &stale));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = SessionStore::new(Duration::from_millis(1));
        store.get_or_create("a");
        store.get_or_create("b");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.cleanup_expired(), 2);
        assert!(store.is_empty());
    }
}
