//! Session manager for handling multiple sessions

use super::store::Session;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Shared, individually locked session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Process-wide store of conversation sessions
///
/// The map lock is only held to look up or insert a handle; the conversation
/// itself is serialized through the per-session mutex. A session whose handle
/// is held outside the map is in use and is never evicted, whether or not its
/// mutex is locked yet.
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    max_sessions: usize,
}

impl SessionManager {
    /// Create a new session manager holding at most `max_sessions` sessions
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Get or create a session
    pub fn get_or_create(&self, key: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().get(key) {
            return handle.clone();
        }

        let mut sessions = self.sessions.write();
        if let Some(handle) = sessions.get(key) {
            return handle.clone();
        }

        if sessions.len() >= self.max_sessions {
            if let Some(oldest) = least_recently_updated(&sessions) {
                info!("Session store full, evicting {}", oldest);
                sessions.remove(&oldest);
            }
        }

        debug!("Creating session {}", key);
        let handle = Arc::new(Mutex::new(Session::new(key)));
        sessions.insert(key.to_string(), handle.clone());
        handle
    }

    /// Get a session if it exists
    pub fn get(&self, key: &str) -> Option<SessionHandle> {
        self.sessions.read().get(key).cloned()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Drop sessions not updated within `ttl`. Sessions in use are kept.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let cutoff = Utc::now()
            .checked_sub_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, handle| {
            if in_use(handle) {
                return true;
            }
            match handle.try_lock() {
                Ok(session) => session.updated_at >= cutoff,
                Err(_) => true,
            }
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(10_000)
    }
}

/// Handles are only cloned under the map lock, so with the write lock held
/// this count cannot grow underneath the caller.
fn in_use(handle: &SessionHandle) -> bool {
    Arc::strong_count(handle) > 1
}

fn least_recently_updated(sessions: &HashMap<String, SessionHandle>) -> Option<String> {
    sessions
        .iter()
        .filter(|(_, handle)| !in_use(handle))
        .filter_map(|(key, handle)| {
            handle
                .try_lock()
                .ok()
                .map(|session| (key.clone(), session.updated_at))
        })
        .min_by_key(|(_, updated_at)| *updated_at)
        .map(|(key, _)| key)
}
