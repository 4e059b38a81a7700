//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use lead_agent_agent::ConversationEngine;
use lead_agent_config::Settings;
use lead_agent_llm::LlmBackend;

use crate::capture::{InMemoryLeadStore, LeadStore};
use crate::session::SessionManager;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub engine: Arc<ConversationEngine>,
    pub sessions: Arc<SessionManager>,
    pub leads: Arc<dyn LeadStore>,
}

impl AppState {
    pub fn new(config: Settings, backend: Arc<dyn LlmBackend>, leads: Arc<dyn LeadStore>) -> Self {
        let engine = ConversationEngine::new(backend, &config);
        let sessions = SessionManager::new(
            config.server.max_sessions,
            config.server.session_timeout(),
        );

        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            sessions: Arc::new(sessions),
            leads,
        }
    }

    /// State with an in-memory lead store
    pub fn in_memory(config: Settings, backend: Arc<dyn LlmBackend>) -> Self {
        Self::new(config, backend, Arc::new(InMemoryLeadStore::new()))
    }
}
