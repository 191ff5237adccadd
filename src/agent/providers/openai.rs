//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, local proxies)
//! via the base URL override in [`ReportConfig`].

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    ResponseFormat as OpenAiResponseFormat, ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::agent::config::ReportConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// Base delay between retry attempts; doubled after each failure.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// `OpenAI`-compatible LLM provider.
///
/// Wraps the `async-openai` client for chat completions. Each attempt is
/// bounded by the configured timeout; timeouts and transport errors are
/// retried with exponential backoff. Rate-limit and 5xx retries are left to
/// the SDK's own backoff.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    timeout: Duration,
    max_retries: u32,
}

impl OpenAiProvider {
    /// Creates a new provider from pipeline configuration.
    #[must_use]
    pub fn new(config: &ReportConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            timeout: config.timeout,
            max_retries: config.max_retries,
        }
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Maps our response contract onto the SDK's `response_format`.
    fn convert_format(format: &ResponseFormat) -> Option<OpenAiResponseFormat> {
        match format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(OpenAiResponseFormat::JsonObject),
            ResponseFormat::JsonSchema { name, schema } => Some(OpenAiResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: name.clone(),
                    schema: Some(schema.clone()),
                    strict: None,
                },
            }),
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature.filter(|&t| t != 0.0),
            max_completion_tokens: request.max_tokens,
            response_format: Self::convert_format(&request.response_format),
            ..Default::default()
        }
    }

    /// Transport failures worth another attempt.
    const fn is_retryable(err: &OpenAIError) -> bool {
        matches!(err, OpenAIError::Reqwest(_))
    }

    /// Sends one request with timeout and retry handling.
    async fn send_with_retry(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<async_openai::types::CreateChatCompletionResponse, AgentError> {
        let mut attempt: u32 = 0;
        loop {
            let chat = self.client.chat();
            let call = chat.create(request.clone());
            let failure = match tokio::time::timeout(self.timeout, call).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) if Self::is_retryable(&e) => AgentError::ApiRequest {
                    message: e.to_string(),
                    status: None,
                },
                Ok(Err(e)) => {
                    return Err(AgentError::ApiRequest {
                        message: e.to_string(),
                        status: None,
                    });
                }
                Err(_) => AgentError::Timeout {
                    after: self.timeout,
                },
            };

            if attempt >= self.max_retries {
                return Err(failure);
            }
            let delay = RETRY_BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt));
            warn!(attempt, ?delay, error = %failure, "model call failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let openai_request = Self::build_request(request);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            json = request.response_format.is_json(),
            "sending chat completion"
        );

        let response = self.send_with_retry(openai_request).await?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let finish_reason = choice.and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }
}
