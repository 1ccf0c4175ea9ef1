//! Server shared state
//!
//! Holds the location pipeline and per-client sessions. Sessions idle past
//! the configured TTL are swept whenever a new one is opened, and the map
//! never holds more than `max_sessions` entries.

use crate::config::Config;
use crate::directory::FileDirectory;
use crate::error::Result;
use crate::session::{Locator, SessionContext};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Shared state for the HTTP server
pub struct AppState {
    /// Location pipeline
    pub locator: Locator<FileDirectory>,

    /// Client sessions by id
    sessions: RwLock<HashMap<Uuid, Arc<SessionContext>>>,

    session_ttl: Duration,
    max_sessions: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(config: &Config) -> Result<Self> {
        let directory = FileDirectory::new(config.directory_path()?);
        let locator = Locator::from_config(config, directory)?;

        Ok(Self {
            locator,
            sessions: RwLock::new(HashMap::new()),
            session_ttl: config.session_ttl(),
            max_sessions: config.server.max_sessions.max(1),
        })
    }

    /// Override the session lifetime limits
    pub fn with_session_limits(mut self, ttl: Duration, max_sessions: usize) -> Self {
        self.session_ttl = ttl;
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Get the session for `id`, creating it when unknown, expired or absent
    pub async fn session(&self, id: Option<Uuid>) -> Arc<SessionContext> {
        if let Some(id) = id {
            if let Some(session) = self.existing_session(id).await {
                session.touch();
                return session;
            }
        }

        let mut sessions = self.sessions.write().await;
        self.evict(&mut sessions);

        let session = Arc::new(match id {
            Some(id) => SessionContext::with_id(id),
            None => SessionContext::new(),
        });
        let session = Arc::clone(sessions.entry(session.id()).or_insert(session));
        session.touch();
        debug!(session = %session.id(), open = sessions.len(), "session opened");
        session
    }

    /// Look up a live session
    pub async fn existing_session(&self, id: Uuid) -> Option<Arc<SessionContext>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|session| session.idle_for() <= self.session_ttl)
            .cloned()
    }

    /// Number of sessions currently held
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop expired sessions, then the least recently used until one more fits
    fn evict(&self, sessions: &mut HashMap<Uuid, Arc<SessionContext>>) {
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for() <= self.session_ttl);

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .max_by_key(|(_, session)| session.idle_for())
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "sessions evicted");
        }
    }
}
