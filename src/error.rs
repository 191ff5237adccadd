//! Error types for dossier-rs.
//!
//! Library code returns [`AgentError`] from the pipeline and [`CommandError`]
//! from the CLI layer; both fold into the top-level [`Error`].

use std::time::Duration;

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure inside the agent pipeline.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Failure in a CLI command.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure outside the pipeline.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure outside the pipeline.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by agents, providers and the orchestration layer.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured.
    #[error("API key missing: set OPENAI_API_KEY or DOSSIER_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is not known.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// The model API rejected or failed the request.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when the provider exposes one.
        status: Option<u16>,
    },

    /// A single model call exceeded the configured timeout on every attempt.
    #[error("model call timed out after {after:?}")]
    Timeout {
        /// Per-attempt timeout.
        after: Duration,
    },

    /// The model returned output that does not match the expected shape.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// Raw model output.
        content: String,
    },

    /// The planner returned no sections.
    #[error("research plan for '{title}' contains no sections")]
    EmptyPlan {
        /// Planned report title.
        title: String,
    },

    /// A section branch failed during parallel research.
    #[error("section '{topic}' failed: {source}")]
    SectionFailed {
        /// Section topic.
        topic: String,
        /// Underlying failure.
        #[source]
        source: Box<AgentError>,
    },

    /// A section branch did not finish in time.
    #[error("section '{topic}' did not finish within {after:?}")]
    SectionTimeout {
        /// Section topic.
        topic: String,
        /// Branch deadline.
        after: Duration,
    },

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,

    /// The human feedback channel failed.
    #[error("feedback channel error: {message}")]
    Feedback {
        /// What went wrong.
        message: String,
    },

    /// Generic orchestration failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// What went wrong.
        message: String,
    },

    /// Writing the published report failed.
    #[error("failed to publish report to {path}: {source}")]
    Publish {
        /// Target path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not run to completion.
    #[error("{0}")]
    ExecutionFailed(String),

    /// A command-line argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
