//! Conversation logic for the health assistant
//!
//! This crate provides emergency detection, prompt assembly, the symptom
//! fallback and the agent that ties them to a model provider.

pub mod context;
pub mod conversation;
pub mod emergency;
pub mod records;
pub mod symptoms;

pub use context::{ContextBuilder, MEDICAL_ASSISTANT_PROMPT};
pub use conversation::{AgentSettings, ChatReply, ConversationAgent, ReplyOutcome};
pub use emergency::{EmergencyDetector, EmergencyResult, Severity};
pub use records::{AppointmentConfirmation, AppointmentManager, HealthRecordRetriever, RecordMatch};
pub use symptoms::{SymptomAnalysis, SymptomAnalyzer};
