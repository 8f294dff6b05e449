use health_assistant_agent::{AppointmentManager, ConversationAgent, HealthRecordRetriever};
use health_assistant_core::session::SessionManager;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ConversationAgent>,
    pub appointments: AppointmentManager,
    pub records: HealthRecordRetriever,
}

impl AppState {
    pub fn new(agent: Arc<ConversationAgent>) -> Self {
        Self {
            agent,
            appointments: AppointmentManager::new(),
            records: HealthRecordRetriever::new(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.agent.sessions()
    }
}
