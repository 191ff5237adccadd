//! Provider-agnostic message types for LLM communication.
//!
//! These types decouple agent logic from any specific LLM SDK.

use serde::{Deserialize, Serialize};

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Message content.
    pub content: String,
}

/// Output contract requested from the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// Free text.
    #[default]
    Text,
    /// Any JSON object.
    JsonObject,
    /// JSON matching a named schema.
    JsonSchema {
        /// Schema name sent to the provider.
        name: String,
        /// JSON Schema document.
        schema: serde_json::Value,
    },
}

impl ResponseFormat {
    /// Builds a [`ResponseFormat::JsonSchema`] from a `schemars`-derived type.
    #[must_use]
    pub fn schema_for<T: schemars::JsonSchema>(name: &str) -> Self {
        let schema = schemars::schema_for!(T);
        Self::JsonSchema {
            name: name.to_string(),
            schema: schema.to_value(),
        }
    }

    /// Returns `true` if any JSON output is requested.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// A chat completion request (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0.0–2.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Requested output contract.
    pub response_format: ResponseFormat,
}

/// Token usage statistics from a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated in the completion.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

/// A chat completion response (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated text content.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Finish reason from the model (e.g., `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::System,
        content: content.to_string(),
    }
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::User,
        content: content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(schemars::JsonSchema)]
    #[allow(dead_code)]
    struct Probe {
        accepted: bool,
    }

    #[test]
    fn test_system_message() {
        let msg = system_message("You are an editor.");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "You are an editor.");
    }

    #[test]
    fn test_user_message() {
        let msg = user_message("Plan the report");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Plan the report");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Assistant).unwrap_or_default();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_schema_for_embeds_properties() {
        let format = ResponseFormat::schema_for::<Probe>("probe");
        assert!(format.is_json());
        match format {
            ResponseFormat::JsonSchema { name, schema } => {
                assert_eq!(name, "probe");
                assert!(schema.to_string().contains("accepted"));
            }
            other => unreachable!("unexpected format {other:?}"),
        }
    }

    #[test]
    fn test_text_is_not_json() {
        assert!(!ResponseFormat::Text.is_json());
        assert!(ResponseFormat::JsonObject.is_json());
    }
}
