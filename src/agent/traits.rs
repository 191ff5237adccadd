//! Agent trait definition.
//!
//! The editor, reviewer, reviser and writer implement this trait, which
//! gives them a uniform way to turn a user prompt into a model call.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use super::message::{
    ChatRequest, ChatResponse, ResponseFormat, TokenUsage, system_message, user_message,
};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by the model-backed agents.
///
/// An agent is a fixed role (planning, reviewing, writing) with a system
/// prompt and model settings. [`Agent::execute`] runs it for free text;
/// [`execute_structured`] runs it against a JSON schema.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and progress labels.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Builds the request for one call.
    fn request(&self, user_msg: &str, response_format: ResponseFormat) -> ChatRequest {
        ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            response_format,
        }
    }

    /// Executes the agent for free-text output.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let request = self.request(user_msg, ResponseFormat::Text);
        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes an agent against the JSON schema of `T` and parses the result.
///
/// This is a free function because generic methods would make [`Agent`]
/// unusable as a trait object.
///
/// # Errors
///
/// Returns [`AgentError`] on API failures, or
/// [`AgentError::ResponseParse`] if the output does not deserialize as `T`.
pub async fn execute_structured<T>(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    user_msg: &str,
    schema_name: &str,
) -> Result<T, AgentError>
where
    T: DeserializeOwned + JsonSchema,
{
    let request = agent.request(user_msg, ResponseFormat::schema_for::<T>(schema_name));
    let response = provider.chat(&request).await?;

    if response.finish_reason.as_deref() == Some("length") {
        tracing::warn!(agent = agent.name(), "structured response truncated at max_tokens");
    }

    parse_json_response(&response.content, schema_name)
}

/// Parses model output as JSON, tolerating a surrounding markdown fence.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] if the content is not valid JSON
/// for `T`.
pub fn parse_json_response<T: DeserializeOwned>(content: &str, what: &str) -> Result<T, AgentError> {
    let trimmed = content.trim();

    // Handle markdown code blocks
    let json_str = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    serde_json::from_str(json_str).map_err(|e| AgentError::ResponseParse {
        message: format!("invalid {what} response: {e}"),
        content: content.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedProvider;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Probe {
        ok: bool,
    }

    struct ProbeAgent;

    impl Agent for ProbeAgent {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        fn system_prompt(&self) -> &str {
            "You are a probe."
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let probe: Probe = parse_json_response(r#"{"ok": true}"#, "probe")
            .unwrap_or_else(|_| unreachable!());
        assert!(probe.ok);
    }

    #[test]
    fn test_parse_fenced_json() {
        let probe: Probe = parse_json_response("```json\n{\"ok\": false}\n```", "probe")
            .unwrap_or_else(|_| unreachable!());
        assert!(!probe.ok);
    }

    #[test]
    fn test_parse_invalid_json_keeps_content() {
        let err = parse_json_response::<Probe>("not json", "probe");
        assert!(matches!(
            err,
            Err(AgentError::ResponseParse { ref content, .. }) if content == "not json"
        ));
    }

    #[test]
    fn test_request_uses_agent_settings() {
        let request = ProbeAgent.request("hello", ResponseFormat::JsonObject);
        assert_eq!(request.model, "test-model");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, "You are a probe.");
        assert_eq!(request.max_tokens, Some(2048));
        assert!(request.response_format.is_json());
    }

    #[tokio::test]
    async fn test_execute_structured_sends_schema() {
        let provider = ScriptedProvider::new([r#"{"ok": true}"#]);
        let probe: Probe = execute_structured(&ProbeAgent, &provider, "check", "probe")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(probe.ok);
        let sent = provider.requests();
        assert!(matches!(
            sent[0].response_format,
            ResponseFormat::JsonSchema { ref name, .. } if name == "probe"
        ));
    }

    #[tokio::test]
    async fn test_execute_returns_text() {
        let provider = ScriptedProvider::new(["plain answer"]);
        let response = ProbeAgent
            .execute(&provider, "question")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.content, "plain answer");
    }
}
