//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. Agents never see the SDK.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;

use super::message::{ChatRequest, ChatResponse, TokenUsage};
use crate::error::AgentError;

/// Trait for LLM provider backends.
///
/// Implementations own the transport concerns (HTTP, timeouts, retries)
/// for a specific provider. Callers treat a returned error as final.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures, timeouts, or parse errors.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}

/// Running token totals for one report run.
#[derive(Debug, Default)]
pub struct UsageMeter {
    calls: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl UsageMeter {
    /// Adds one completion's usage.
    pub fn record(&self, usage: &TokenUsage) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.prompt_tokens
            .fetch_add(u64::from(usage.prompt_tokens), Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(u64::from(usage.completion_tokens), Ordering::Relaxed);
    }

    /// Snapshot of the totals so far.
    #[must_use]
    pub fn totals(&self) -> UsageTotals {
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);
        UsageTotals {
            calls: self.calls.load(Ordering::Relaxed),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Aggregated token usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageTotals {
    /// Model calls made.
    pub calls: u64,
    /// Prompt tokens across all calls.
    pub prompt_tokens: u64,
    /// Completion tokens across all calls.
    pub completion_tokens: u64,
    /// Sum of prompt and completion tokens.
    pub total_tokens: u64,
}

/// Provider decorator that records usage of every successful call.
pub struct MeteredProvider {
    inner: Arc<dyn LlmProvider>,
    meter: Arc<UsageMeter>,
}

impl MeteredProvider {
    /// Wraps `inner`, recording into `meter`.
    #[must_use]
    pub fn new(inner: Arc<dyn LlmProvider>, meter: Arc<UsageMeter>) -> Self {
        Self { inner, meter }
    }
}

impl std::fmt::Debug for MeteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeteredProvider")
            .field("inner", &self.inner.name())
            .field("meter", &self.meter)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for MeteredProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let response = self.inner.chat(request).await?;
        self.meter.record(&response.usage);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_metered_provider_sums_usage() {
        let inner: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new(["one", "two"]));
        let meter = Arc::new(UsageMeter::default());
        let provider = MeteredProvider::new(inner, Arc::clone(&meter));
        let request = ChatRequest {
            model: "m".to_string(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            response_format: crate::agent::message::ResponseFormat::Text,
        };
        for _ in 0..2 {
            provider
                .chat(&request)
                .await
                .unwrap_or_else(|_| unreachable!());
        }
        let totals = meter.totals();
        assert_eq!(totals.calls, 2);
        assert_eq!(totals.total_tokens, totals.prompt_tokens + totals.completion_tokens);
        assert!(totals.total_tokens > 0);
    }

    #[test]
    fn test_empty_meter() {
        assert_eq!(UsageMeter::default().totals(), UsageTotals::default());
    }
}
