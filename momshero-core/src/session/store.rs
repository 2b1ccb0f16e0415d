//! Per-user session table with per-key locking and idle eviction.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{Session, SessionUpdate};

/// Storage backend behind the in-memory table.
pub trait SessionPersistence: Send + Sync + fmt::Debug {
    /// Session to start from when a user has no live entry.
    fn load(&self, user_id: &str) -> Option<Session>;

    /// Called whenever a session lock is released.
    fn save(&self, user_id: &str, session: &Session);
}

/// Sessions live only as long as the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

impl SessionPersistence for NoPersistence {
    fn load(&self, _user_id: &str) -> Option<Session> {
        None
    }

    fn save(&self, _user_id: &str, _session: &Session) {}
}

#[derive(Debug)]
struct SessionSlot {
    session: Session,
    last_active: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DialogueStateStore {
    sessions: DashMap<String, Arc<Mutex<SessionSlot>>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl Default for DialogueStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueStateStore {
    pub fn new() -> Self {
        Self::with_persistence(Arc::new(NoPersistence))
    }

    pub fn with_persistence(persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            sessions: DashMap::new(),
            persistence,
        }
    }

    fn slot(&self, user_id: &str) -> Arc<Mutex<SessionSlot>> {
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "Creating session");
                Arc::new(Mutex::new(SessionSlot {
                    session: self.persistence.load(user_id).unwrap_or_default(),
                    last_active: Utc::now(),
                }))
            })
            .value()
            .clone()
    }

    /// Exclusive access to a user's session, created if absent.
    ///
    /// Held across awaits; a second `lock` for the same user waits until the guard drops.
    pub async fn lock(&self, user_id: &str) -> SessionGuard {
        loop {
            let slot = self.slot(user_id);
            let guard = slot.clone().lock_owned().await;

            // The slot may have been evicted while we waited for it.
            let still_current = self
                .sessions
                .get(user_id)
                .is_some_and(|current| Arc::ptr_eq(current.value(), &slot));
            if still_current {
                return SessionGuard {
                    user_id: user_id.to_string(),
                    guard,
                    persistence: self.persistence.clone(),
                };
            }
        }
    }

    /// Snapshot of a user's session, created with defaults if absent.
    pub async fn get_or_create(&self, user_id: &str) -> Session {
        self.lock(user_id).await.clone()
    }

    pub async fn update(&self, user_id: &str, update: SessionUpdate) {
        self.lock(user_id).await.apply(update);
    }

    pub async fn reset(&self, user_id: &str) {
        *self.lock(user_id).await = Session::default();
    }

    /// Drop sessions idle for longer than `max_idle`. Locked sessions are skipped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_idle_at(max_idle, Utc::now())
    }

    pub fn evict_idle_at(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let cutoff = now - max_idle;

        let mut evicted = 0;
        self.sessions.retain(|_, slot| match slot.try_lock() {
            Ok(entry) if entry.last_active < cutoff => {
                evicted += 1;
                false
            }
            _ => true,
        });

        if evicted > 0 {
            debug!(evicted, "Evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Exclusive handle on one user's session. Records activity and persists on drop.
pub struct SessionGuard {
    user_id: String,
    guard: OwnedMutexGuard<SessionSlot>,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.guard.session
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.guard.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.guard.last_active = Utc::now();
        self.persistence.save(&self.user_id, &self.guard.session);
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("user_id", &self.user_id)
            .field("session", &self.guard.session)
            .finish()
    }
}
