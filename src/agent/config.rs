//! Pipeline configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! Per-run choices (query, guidelines, language) live on [`Task`](super::task::Task);
//! this type only carries transport and orchestration limits.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default model used when the task does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default maximum concurrent section branches.
const DEFAULT_MAX_CONCURRENCY: usize = 8;
/// Default revision rounds per section before a draft is force-accepted.
const DEFAULT_MAX_REVISIONS: u32 = 3;
/// Default re-plan rounds driven by human feedback.
const DEFAULT_MAX_PLAN_REVISIONS: u32 = 2;
/// Default query variants generated per research call.
const DEFAULT_MAX_SUBQUERIES: usize = 3;
/// Default max tokens for research (report writing) responses.
const DEFAULT_RESEARCH_MAX_TOKENS: u32 = 4096;
/// Default max tokens for writer/reviser responses.
const DEFAULT_WRITER_MAX_TOKENS: u32 = 4096;
/// Default max tokens for planner/reviewer responses.
const DEFAULT_EDITOR_MAX_TOKENS: u32 = 1024;
/// Default per-attempt request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default max retries per model call.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default deadline for one section branch in seconds.
const DEFAULT_SECTION_TIMEOUT_SECS: u64 = 600;
/// Default wait for a human reply in seconds.
const DEFAULT_FEEDBACK_TIMEOUT_SECS: u64 = 300;
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.35;

/// Configuration for the report pipeline.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used when a task does not specify one.
    pub default_model: String,
    /// Maximum section branches researched concurrently.
    pub max_concurrency: usize,
    /// Revision rounds per section before the latest draft is accepted as-is.
    pub max_revisions: u32,
    /// Re-plan rounds allowed from human feedback.
    pub max_plan_revisions: u32,
    /// Query variants generated for each research call.
    pub max_subqueries: usize,
    /// Maximum tokens for research responses.
    pub research_max_tokens: u32,
    /// Maximum tokens for writer and reviser responses.
    pub writer_max_tokens: u32,
    /// Maximum tokens for planner and reviewer responses.
    pub editor_max_tokens: u32,
    /// Sampling temperature for free-text generation.
    pub temperature: f32,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts per request.
    pub max_retries: u32,
    /// Deadline for one section's research/review/revise cycle.
    pub section_timeout: Duration,
    /// How long to wait for a human reply before continuing without one.
    pub feedback_timeout: Duration,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
    /// Directory published reports are written to.
    pub output_dir: PathBuf,
}

impl ReportConfig {
    /// Creates a new builder for `ReportConfig`.
    #[must_use]
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`ReportConfig`].
#[derive(Debug, Clone, Default)]
pub struct ReportConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    default_model: Option<String>,
    max_concurrency: Option<usize>,
    max_revisions: Option<u32>,
    max_plan_revisions: Option<u32>,
    max_subqueries: Option<usize>,
    research_max_tokens: Option<u32>,
    writer_max_tokens: Option<u32>,
    editor_max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    section_timeout: Option<Duration>,
    feedback_timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl ReportConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("DOSSIER_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("DOSSIER_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("DOSSIER_BASE_URL"))
                .ok();
        }
        if self.default_model.is_none() {
            self.default_model = std::env::var("DOSSIER_MODEL").ok();
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = env_parse("DOSSIER_MAX_CONCURRENCY");
        }
        if self.max_revisions.is_none() {
            self.max_revisions = env_parse("DOSSIER_MAX_REVISIONS");
        }
        if self.section_timeout.is_none() {
            self.section_timeout =
                env_parse::<u64>("DOSSIER_SECTION_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.feedback_timeout.is_none() {
            self.feedback_timeout =
                env_parse::<u64>("DOSSIER_FEEDBACK_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("DOSSIER_PROMPT_DIR").ok().map(PathBuf::from);
        }
        if self.output_dir.is_none() {
            self.output_dir = std::env::var("DOSSIER_OUTPUT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the fallback model.
    #[must_use]
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Sets the maximum concurrency.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the revision cap per section.
    #[must_use]
    pub const fn max_revisions(mut self, n: u32) -> Self {
        self.max_revisions = Some(n);
        self
    }

    /// Sets the re-plan cap for human feedback.
    #[must_use]
    pub const fn max_plan_revisions(mut self, n: u32) -> Self {
        self.max_plan_revisions = Some(n);
        self
    }

    /// Sets the number of query variants per research call.
    #[must_use]
    pub const fn max_subqueries(mut self, n: usize) -> Self {
        self.max_subqueries = Some(n);
        self
    }

    /// Sets the research max tokens.
    #[must_use]
    pub const fn research_max_tokens(mut self, n: u32) -> Self {
        self.research_max_tokens = Some(n);
        self
    }

    /// Sets the writer max tokens.
    #[must_use]
    pub const fn writer_max_tokens(mut self, n: u32) -> Self {
        self.writer_max_tokens = Some(n);
        self
    }

    /// Sets the planner and reviewer max tokens.
    #[must_use]
    pub const fn editor_max_tokens(mut self, n: u32) -> Self {
        self.editor_max_tokens = Some(n);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the max retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the per-section deadline.
    #[must_use]
    pub const fn section_timeout(mut self, duration: Duration) -> Self {
        self.section_timeout = Some(duration);
        self
    }

    /// Sets how long to wait for human feedback.
    #[must_use]
    pub const fn feedback_timeout(mut self, duration: Duration) -> Self {
        self.feedback_timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the report output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builds the [`ReportConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<ReportConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(ReportConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            default_model: self
                .default_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_concurrency: self
                .max_concurrency
                .unwrap_or(DEFAULT_MAX_CONCURRENCY)
                .max(1),
            max_revisions: self.max_revisions.unwrap_or(DEFAULT_MAX_REVISIONS),
            max_plan_revisions: self
                .max_plan_revisions
                .unwrap_or(DEFAULT_MAX_PLAN_REVISIONS),
            max_subqueries: self.max_subqueries.unwrap_or(DEFAULT_MAX_SUBQUERIES),
            research_max_tokens: self
                .research_max_tokens
                .unwrap_or(DEFAULT_RESEARCH_MAX_TOKENS),
            writer_max_tokens: self.writer_max_tokens.unwrap_or(DEFAULT_WRITER_MAX_TOKENS),
            editor_max_tokens: self.editor_max_tokens.unwrap_or(DEFAULT_EDITOR_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            section_timeout: self
                .section_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SECTION_TIMEOUT_SECS)),
            feedback_timeout: self
                .feedback_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_FEEDBACK_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("outputs")),
        })
    }
}
