//! SessionStore - the explicit, injectable owner of all sessions

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

use super::Session;

/// A registered session plus the bookkeeping the sweeper needs
#[derive(Debug)]
pub struct SessionHandle {
    session: Mutex<Session>,
    last_seen: std::sync::Mutex<Instant>,
}

impl SessionHandle {
    fn new(id: &str) -> Self {
        Self {
            session: Mutex::new(Session::new(id)),
            last_seen: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Wait for exclusive access; hold the guard for the whole turn
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Record activity now
    pub fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_seen = *self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        now.saturating_duration_since(last_seen)
    }
}

/// Maps session keys to sessions; idle sessions are evicted by `evict_idle_at`
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<SessionHandle>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Return the session for `key`, registering an empty one on first use
    pub async fn get_or_create(&self, key: &str) -> Arc<SessionHandle> {
        let mut sessions = self.sessions.lock().await;
        let handle = sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                log::info!("Creating session: {}", key);
                Arc::new(SessionHandle::new(key))
            })
            .clone();
        handle.touch();
        handle
    }

    pub async fn get(&self, key: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.lock().await.get(key).cloned()
    }

    /// Drop a session; returns whether it existed
    pub async fn remove(&self, key: &str) -> bool {
        let removed = self.sessions.lock().await.remove(key).is_some();
        if removed {
            log::info!("Removed session: {}", key);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Drop `handle` if the caller holds the only outside reference to it
    ///
    /// Used to forget a session created by a turn that then failed. Any other
    /// request that already looked the key up keeps the session alive.
    pub async fn discard_if_unused(&self, key: &str, handle: &Arc<SessionHandle>) -> bool {
        let mut sessions = self.sessions.lock().await;
        let unused = sessions
            .get(key)
            .is_some_and(|stored| Arc::ptr_eq(stored, handle) && Arc::strong_count(handle) == 2);
        if unused {
            sessions.remove(key);
            log::debug!("Discarded unused session: {}", key);
        }
        unused
    }

    /// Evict sessions idle longer than the timeout as of `now`
    ///
    /// A session that is referenced outside the store (a request holds it)
    /// or whose lock is taken is in use and always kept.
    pub async fn evict_idle_at(&self, now: Instant) -> Vec<String> {
        let mut sessions = self.sessions.lock().await;
        let mut evicted = Vec::new();

        sessions.retain(|key, handle| {
            if Arc::strong_count(handle) > 1 || handle.session.try_lock().is_err() {
                return true;
            }
            if handle.idle_for(now) < self.idle_timeout {
                return true;
            }
            evicted.push(key.clone());
            false
        });

        if !evicted.is_empty() {
            log::info!(
                "Evicted {} idle session(s), {} remaining",
                evicted.len(),
                sessions.len()
            );
        }
        evicted
    }

    /// Run `evict_idle_at` every `interval` until the runtime shuts down
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = self.evict_idle_at(Instant::now()).await;
                log::debug!("Session sweep: {} evicted", evicted.len());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Turn;

    const IDLE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_get_or_create_returns_same_session() {
        let store = SessionStore::new(IDLE);
        let first = store.get_or_create("a").await;
        let second = store.get_or_create("a").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_by_key() {
        let store = SessionStore::new(IDLE);
        {
            let handle = store.get_or_create("a").await;
            handle
                .lock()
                .await
                .commit_turn(vec![Turn::user("hi"), Turn::model_text("hello")]);
        }

        let other = store.get_or_create("b").await;
        assert!(other.lock().await.is_empty());
        assert_eq!(store.get("a").await.unwrap().lock().await.history.len(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new(IDLE);
        store.get_or_create("a").await;

        assert!(store.remove("a").await);
        assert!(!store.remove("a").await);
        assert!(store.get("a").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_discard_only_when_unshared() {
        let store = SessionStore::new(IDLE);
        let ours = store.get_or_create("a").await;
        let waiting = store.get_or_create("a").await;

        assert!(!store.discard_if_unused("a", &ours).await);
        assert_eq!(store.len().await, 1);

        drop(waiting);
        assert!(store.discard_if_unused("a", &ours).await);
        assert!(store.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_discard_ignores_replaced_session() {
        let store = SessionStore::new(IDLE);
        let stale = store.get_or_create("a").await;
        store.remove("a").await;
        let fresh = store.get_or_create("a").await;
        drop(fresh);

        assert!(!store.discard_if_unused("a", &stale).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let store = SessionStore::new(IDLE);
        drop(store.get_or_create("old").await);

        let now = Instant::now();
        assert!(store.evict_idle_at(now).await.is_empty());

        let later = now + IDLE + Duration::from_secs(1);
        assert_eq!(store.evict_idle_at(later).await, vec!["old".to_string()]);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sessions_in_use_are_not_evicted() {
        let store = SessionStore::new(IDLE);
        let held = store.get_or_create("held").await;
        let locked = store.get_or_create("locked").await;
        let guard = locked.lock().await;

        let later = Instant::now() + IDLE * 2;
        assert!(store.evict_idle_at(later).await.is_empty());
        assert_eq!(store.len().await, 2);

        drop(guard);
        drop(locked);
        drop(held);
        assert_eq!(store.evict_idle_at(later).await.len(), 2);
    }
}
