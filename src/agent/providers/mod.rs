//! Concrete [`LlmProvider`] implementations and the factory that picks one
//! from a [`ReportConfig`].

pub mod openai;

use std::sync::Arc;

use tracing::debug;

use super::config::ReportConfig;
use super::provider::LlmProvider;
use crate::error::AgentError;

pub use openai::OpenAiProvider;

/// Builds the provider every agent of a run shares.
///
/// Names are matched case-insensitively. `openai` also covers any
/// OpenAI-compatible endpoint set through `base_url`.
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &ReportConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    let name = config.provider.trim().to_ascii_lowercase();
    let provider: Arc<dyn LlmProvider> = match name.as_str() {
        "openai" => Arc::new(OpenAiProvider::new(config)),
        _ => {
            return Err(AgentError::UnsupportedProvider {
                name: config.provider.clone(),
            });
        }
    };
    debug!(
        provider = provider.name(),
        endpoint = config.base_url.as_deref().unwrap_or("default"),
        model = %config.default_model,
        "provider ready"
    );
    Ok(provider)
}
