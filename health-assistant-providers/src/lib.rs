//! LLM provider integrations for the health assistant
//!
//! This crate provides the provider abstraction used by the conversation
//! agent and a client for OpenAI-compatible chat-completion endpoints.

pub mod base;
pub mod openai;

pub use base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
pub use openai::OpenAICompatClient;
