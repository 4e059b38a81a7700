//! Session Management
//!
//! In-process registry of chat sessions. Each session's state sits behind a
//! `tokio::sync::Mutex`; a turn holds it for its whole duration, so a second
//! turn on the same session is rejected rather than queued.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, MutexGuard};

use lead_agent_agent::SessionState;

use crate::metrics::record_active_sessions;
use crate::ServerError;

/// Registered session
pub struct Session {
    pub id: String,
    state: Mutex<SessionState>,
    last_activity: RwLock<Instant>,
}

impl Session {
    pub fn new(state: SessionState) -> Self {
        Self {
            id: state.id.clone(),
            state: Mutex::new(state),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Lock for a turn; fails immediately when a turn is in flight
    pub fn try_lock(&self) -> Result<MutexGuard<'_, SessionState>, ServerError> {
        self.state
            .try_lock()
            .map_err(|_| ServerError::SessionBusy(self.id.clone()))
    }

    /// Wait for the state, for read-only views
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize, session_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval: (session_timeout / 4).max(Duration::from_secs(1)),
        }
    }

    /// Periodically drop idle sessions until the returned sender fires
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = manager.count(),
                                "Expired idle sessions"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Register a new session whose transcript starts with `greeting`
    pub fn create(&self, greeting: &str) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);
            if sessions.len() >= self.max_sessions {
                tracing::warn!(max = self.max_sessions, "Session capacity reached");
                return Err(ServerError::Capacity);
            }
        }

        let session = Arc::new(Session::new(SessionState::new(greeting)));
        sessions.insert(session.id.clone(), session.clone());
        record_active_sessions(sessions.len());

        tracing::info!(session_id = %session.id, "Created session");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, ServerError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ServerError::Session(id.to_string()))
    }

    /// Remove a session; returns whether it existed
    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write();
        let removed = sessions.remove(id).is_some();
        if removed {
            record_active_sessions(sessions.len());
            tracing::info!(session_id = %id, "Removed session");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop idle sessions; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.session_timeout));
        let removed = before - sessions.len();
        if removed > 0 {
            record_active_sessions(sessions.len());
        }
        removed
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(max: usize) -> SessionManager {
        SessionManager::new(max, Duration::from_secs(60))
    }

    #[test]
    fn test_session_creation() {
        let manager = manager(10);
        let session = manager.create("Hello!").unwrap();

        assert_eq!(manager.count(), 1);
        assert!(!session.is_expired(Duration::from_secs(60)));
        assert_eq!(manager.get(&session.id).unwrap().id, session.id);
        assert_eq!(manager.list(), vec![session.id.clone()]);
    }

    #[test]
    fn test_session_remove() {
        let manager = manager(10);
        let session = manager.create("Hello!").unwrap();

        assert!(manager.remove(&session.id));
        assert!(!manager.remove(&session.id));
        assert!(matches!(manager.get(&session.id), Err(ServerError::Session(_))));
    }

    #[test]
    fn test_capacity() {
        let manager = manager(2);
        manager.create("Hello!").unwrap();
        manager.create("Hello!").unwrap();
        assert!(matches!(manager.create("Hello!"), Err(ServerError::Capacity)));
    }

    #[test]
    fn test_expired_sessions_free_capacity() {
        let manager = SessionManager::new(1, Duration::from_millis(10));
        manager.create("Hello!").unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert!(manager.create("Hello!").is_ok());
        assert_eq!(manager.count(), 1);
    }

    #[tokio::test]
    async fn test_second_turn_is_rejected_while_locked() {
        let manager = manager(10);
        let session = manager.create("Hello!").unwrap();

        let guard = session.try_lock().unwrap();
        assert!(matches!(session.try_lock(), Err(ServerError::SessionBusy(_))));
        drop(guard);

        assert!(session.try_lock().is_ok());
        assert_eq!(session.lock().await.transcript().len(), 1);
    }
}
