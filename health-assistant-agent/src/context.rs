//! Context builder for assembling prompts

use health_assistant_core::session::{ChatMessage, Role};
use health_assistant_providers::Message;

/// Instruction sent as the first message of every request
pub const MEDICAL_ASSISTANT_PROMPT: &str = include_str!("../prompts/medical_assistant.txt");

/// Builds the message list for LLM requests
///
/// The system prompt is never stored in session history; it is prepended
/// fresh on every call.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
    history_window: usize,
}

impl ContextBuilder {
    /// Create a new context builder replaying at most `history_window`
    /// stored messages
    pub fn new(history_window: usize) -> Self {
        Self {
            system_prompt: MEDICAL_ASSISTANT_PROMPT.trim_end().to_string(),
            history_window,
        }
    }

    /// Replace the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Build the complete message list for an LLM call
    pub fn build_messages(&self, history: &[ChatMessage], current_message: &str) -> Vec<Message> {
        let start = history.len().saturating_sub(self.history_window);
        let mut messages = Vec::with_capacity(history.len() - start + 2);

        messages.push(Message::system(self.system_prompt.clone()));

        for msg in &history[start..] {
            if msg.role == Role::System {
                continue;
            }
            messages.push(Message::from(msg));
        }

        messages.push(Message::user(current_message));
        messages
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(12)
    }
}
