//! OpenAI-compatible chat-completion client

use async_trait::async_trait;
use health_assistant_core::config::ProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

/// Client for any endpoint speaking the OpenAI `/chat/completions` protocol
pub struct OpenAICompatClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    timeout: Duration,
}

impl OpenAICompatClient {
    /// Create a new client
    pub fn new(
        api_key: Option<String>,
        api_base: impl Into<String>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let api_base = api_base.into().trim().trim_end_matches('/').to_string();

        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base,
            api_key,
            default_model: default_model.into(),
            timeout,
        }
    }

    /// Create a client from the provider section of the config
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.api_key(),
            config.api_base.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn parse_response(&self, response: ChatCompletionResponse) -> ProviderResult<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        let mut usage = HashMap::new();
        usage.insert("prompt_tokens".to_string(), response.usage.prompt_tokens);
        usage.insert(
            "completion_tokens".to_string(),
            response.usage.completion_tokens,
        );
        usage.insert("total_tokens".to_string(), response.usage.total_tokens);

        Ok(LLMResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        req_builder
    }

    fn map_send_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout.as_secs())
        } else {
            ProviderError::HttpError(err)
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let request = ChatCompletionRequest {
            model: model.clone(),
            messages,
            max_tokens,
            temperature,
        };

        debug!(
            "Sending chat request to {} with model {} ({} messages)",
            self.api_base,
            model,
            request.messages.len()
        );

        let url = format!("{}/chat/completions", self.api_base);
        let req_builder = self.apply_headers(self.client.post(&url).json(&request));

        let response = req_builder
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        let response_data: ChatCompletionResponse = serde_json::from_str(&body)?;
        self.parse_response(response_data)
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard, api_key: Option<&str>) -> OpenAICompatClient {
        OpenAICompatClient::new(
            api_key.map(String::from),
            server.url(),
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OpenAICompatClient::new(
            None,
            "https://api.openai.com/v1/",
            "gpt-4o-mini",
            Duration::from_secs(1),
        );
        assert_eq!(client.api_base(), "https://api.openai.com/v1");
        assert_eq!(client.get_default_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_from_config() {
        let config = ProviderConfig::default();
        let client = OpenAICompatClient::from_config(&config);
        assert_eq!(client.api_base(), "https://api.openai.com/v1");
        assert!(client.api_key.is_none());
        assert_eq!(client.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_chat_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "头痛"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{
                        "message": {"role": "assistant", "content": "多休息"},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let response = client
            .chat(
                vec![Message::system("sys"), Message::user("头痛")],
                None,
                256,
                0.3,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content.as_deref(), Some("多休息"));
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.get("total_tokens"), Some(&13));
    }

    #[tokio::test]
    async fn test_chat_without_key_sends_no_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"},"finish_reason":null}]}"#)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let response = client
            .chat(vec![Message::user("hi")], None, 16, 0.3)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content.as_deref(), Some("ok"));
        assert_eq!(response.finish_reason, "stop");
    }

    #[tokio::test]
    async fn test_chat_api_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"invalid api key"}}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("bad"));
        let err = client
            .chat(vec![Message::user("hi")], None, 16, 0.3)
            .await
            .unwrap_err();

        match err {
            ProviderError::ApiError(text) => {
                assert!(text.contains("401"));
                assert!(text.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_empty_choices_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client
            .chat(vec![Message::user("hi")], None, 16, 0.3)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_chat_malformed_body_is_json_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client
            .chat(vec![Message::user("hi")], None, 16, 0.3)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::JsonError(_)));
    }

    #[tokio::test]
    async fn test_chat_unreachable_endpoint() {
        let client = OpenAICompatClient::new(
            None,
            "http://127.0.0.1:9",
            "gpt-4o-mini",
            Duration::from_secs(2),
        );
        let err = client
            .chat(vec![Message::user("hi")], None, 16, 0.3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::HttpError(_) | ProviderError::Timeout(_)
        ));
    }
}
