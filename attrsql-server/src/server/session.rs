use std::sync::Arc;
use std::time::{Duration, Instant};

use attrsql::RequirementTable;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One browser page's working table. Held only in memory.
pub struct Session {
    pub table: Mutex<RequirementTable>,
    last_active: std::sync::Mutex<Instant>,
}

impl Session {
    fn new() -> Self {
        Self {
            table: Mutex::new(RequirementTable::empty()),
            last_active: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn touch(&self) {
        if let Ok(mut last_active) = self.last_active.lock() {
            *last_active = Instant::now();
        }
    }

    /// A locked table means a request (typically a generation run) is still
    /// working on it.
    fn is_busy(&self) -> bool {
        self.table.try_lock().is_err()
    }

    fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .map(|last_active| last_active.elapsed())
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct SessionManager {
    sessions: DashMap<Uuid, Arc<Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&self) -> (Uuid, Arc<Session>) {
        let id = Uuid::new_v4();
        let session = Arc::new(Session::new());
        self.sessions.insert(id, session.clone());
        tracing::debug!(session_id = %id, "Session created");
        (id, session)
    }

    /// Look up a session and mark it active. The map entry is released before
    /// returning so callers may hold the table lock across awaits.
    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.get(id).map(|entry| entry.value().clone())?;
        session.touch();
        Some(session)
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for longer than `max_idle`. Busy sessions are kept.
    /// Returns how many were removed.
    pub fn cleanup_inactive_sessions(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.is_busy() || session.idle_for() <= max_idle);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::info!(removed, "Removed inactive sessions");
        }
        removed
    }
}
