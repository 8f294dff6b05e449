//! Conversation agent: emergency short-circuit, prompt assembly, model call
//! and template fallback for one chat turn.

use health_assistant_core::config::Config;
use health_assistant_core::session::SessionManager;
use health_assistant_core::utils::preview;
use health_assistant_providers::{LLMProvider, Message, ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::ContextBuilder;
use crate::emergency::{EmergencyDetector, EmergencyResult};
use crate::symptoms::SymptomAnalyzer;

/// A reply containing any of these already carries a disclaimer
pub const DISCLAIMER_MARKERS: [&str; 2] = ["仅供参考", "不能替代"];

/// Appended to model replies that lack a disclaimer
pub const DISCLAIMER: &str =
    "\n\n重要提示：以上建议仅供参考，不能替代专业医疗诊断。如有疑问或症状持续，请及时咨询专业医生。";

/// Closing line of every fallback reply
pub const FALLBACK_APOLOGY: &str =
    "抱歉，当前 AI 服务暂时不可用。建议你咨询专业医生获取更准确的医疗建议。";

/// The reply contract returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    pub session_id: String,
    pub emergency: bool,
}

/// How a chat turn was answered
#[derive(Debug, Clone)]
pub enum ReplyOutcome {
    /// The model answered
    Model(ChatReply),
    /// The model call failed and the symptom template was used instead
    Degraded { reply: ChatReply, cause: String },
    /// Emergency keywords matched; the model was never called
    Emergency {
        reply: ChatReply,
        detection: EmergencyResult,
    },
}

impl ReplyOutcome {
    pub fn reply(&self) -> &ChatReply {
        match self {
            ReplyOutcome::Model(reply)
            | ReplyOutcome::Degraded { reply, .. }
            | ReplyOutcome::Emergency { reply, .. } => reply,
        }
    }

    pub fn into_reply(self) -> ChatReply {
        match self {
            ReplyOutcome::Model(reply)
            | ReplyOutcome::Degraded { reply, .. }
            | ReplyOutcome::Emergency { reply, .. } => reply,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReplyOutcome::Model(_) => "model",
            ReplyOutcome::Degraded { .. } => "degraded",
            ReplyOutcome::Emergency { .. } => "emergency",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ReplyOutcome::Degraded { .. })
    }
}

/// Model call parameters
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Overrides the provider's default model when set
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on one model call
    pub timeout: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.3,
            max_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Routes chat messages through emergency detection and the model
pub struct ConversationAgent {
    provider: Arc<dyn LLMProvider>,
    sessions: Arc<SessionManager>,
    context: ContextBuilder,
    detector: EmergencyDetector,
    analyzer: SymptomAnalyzer,
    settings: AgentSettings,
}

impl ConversationAgent {
    /// Create an agent with default detector, prompt and settings
    pub fn new(provider: Arc<dyn LLMProvider>, sessions: Arc<SessionManager>) -> Self {
        Self {
            provider,
            sessions,
            context: ContextBuilder::default(),
            detector: EmergencyDetector::default(),
            analyzer: SymptomAnalyzer::new(),
            settings: AgentSettings::default(),
        }
    }

    /// Create an agent configured from the loaded config
    pub fn from_config(
        provider: Arc<dyn LLMProvider>,
        sessions: Arc<SessionManager>,
        config: &Config,
    ) -> Self {
        let settings = AgentSettings {
            model: Some(config.provider.model.clone()),
            temperature: config.provider.temperature,
            max_tokens: config.provider.max_tokens,
            timeout: Duration::from_secs(config.provider.timeout_secs),
        };

        Self::new(provider, sessions)
            .with_context(ContextBuilder::new(config.agent.history_window))
            .with_detector(EmergencyDetector::with_keywords(
                config.agent.extra_emergency_keywords.iter().cloned(),
            ))
            .with_settings(settings)
    }

    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn with_detector(mut self, detector: EmergencyDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn detector(&self) -> &EmergencyDetector {
        &self.detector
    }

    /// Answer one chat message
    ///
    /// Every message gets a reply. Model failures produce
    /// [`ReplyOutcome::Degraded`] rather than an error.
    pub async fn process_message(&self, message: &str, session_id: Option<String>) -> ReplyOutcome {
        let session_id = match session_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };

        info!("Processing message for session {}: {}", session_id, preview(message, 80));

        let handle = self.sessions.get_or_create(&session_id);

        let detection = self.detector.detect(message);
        if detection.is_emergency {
            // The session exists but the triggering message is not added to history.
            warn!(
                session_id = %session_id,
                keywords = ?detection.matched_keywords,
                "Emergency keywords detected, skipping model"
            );
            let reply = ChatReply {
                message: detection.message.clone().unwrap_or_default(),
                session_id,
                emergency: true,
            };
            return ReplyOutcome::Emergency { reply, detection };
        }

        // Held until the exchange is stored so turns in one session never interleave.
        let mut session = handle.lock().await;

        let messages = self.context.build_messages(&session.messages, message);
        debug!("Prompt for session {} has {} messages", session_id, messages.len());

        let (text, cause) = match self.ask_model(messages).await {
            Ok(text) => (ensure_disclaimer(text), None),
            Err(e) => {
                warn!("LLM call failed for session {}: {}", session_id, e);
                (self.fallback_reply(message), Some(e.to_string()))
            }
        };

        session.add_exchange(message, text.clone());
        drop(session);

        info!("Response to session {}: {}", session_id, preview(&text, 120));

        let reply = ChatReply {
            message: text,
            session_id,
            emergency: false,
        };
        match cause {
            None => ReplyOutcome::Model(reply),
            Some(cause) => ReplyOutcome::Degraded { reply, cause },
        }
    }

    async fn ask_model(&self, messages: Vec<Message>) -> ProviderResult<String> {
        let call = self.provider.chat(
            messages,
            self.settings.model.clone(),
            self.settings.max_tokens,
            self.settings.temperature,
        );

        let response = tokio::time::timeout(self.settings.timeout, call)
            .await
            .map_err(|_| ProviderError::Timeout(self.settings.timeout.as_secs()))??;

        match response.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(ProviderError::InvalidResponse(
                "model returned an empty reply".to_string(),
            )),
        }
    }

    fn fallback_reply(&self, message: &str) -> String {
        let analysis = self.analyzer.analyze(message);
        let conditions = analysis.possible_conditions.join("\n");

        format!(
            "根据你的描述，我理解你的健康关切。

{conditions}

{recommendation}

建议：
详细记录症状出现的时间、频率、严重程度，注意观察症状变化。如果症状持续、加重或出现其他不适，请及时就医。

重要提示：本助手仅供参考，不能替代专业医疗诊断。如有紧急情况（如胸痛、呼吸困难、意识异常等），请立即拨打 120 或前往医院急诊科。

{FALLBACK_APOLOGY}",
            recommendation = analysis.recommendation,
        )
    }
}

/// Append the standard disclaimer unless the reply already has one
pub fn ensure_disclaimer(mut reply: String) -> String {
    if !DISCLAIMER_MARKERS.iter().any(|marker| reply.contains(marker)) {
        reply.push_str(DISCLAIMER);
    }
    reply
}
