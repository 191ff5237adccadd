//! Writer agent.
//!
//! Writes the introduction, conclusion, table of contents and source list
//! around the accepted sections, and localizes the report headings.

use std::sync::Arc;

use tracing::debug;

use super::catalog::{Catalog, Message};
use super::progress::{ProgressEvent, ProgressSink};
use super::prompt;
use super::provider::LlmProvider;
use super::state::{Headers, ReportLayout, ResearchState};
use super::task::Task;
use super::traits::{Agent, execute_structured};
use crate::error::AgentError;

const AGENT: &str = "WRITER";

/// Writes the report frame.
#[derive(Clone)]
pub struct WriterAgent {
    provider: Arc<dyn LlmProvider>,
    sink: Arc<dyn ProgressSink>,
    catalog: Catalog,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl WriterAgent {
    /// Creates a writer.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        sink: Arc<dyn ProgressSink>,
        catalog: Catalog,
        model: &str,
        system_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            provider,
            sink,
            catalog,
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            max_tokens,
            temperature,
        }
    }

    /// Writes the layout from the collected research data.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ResponseParse`] for malformed output and
    /// propagates model failures.
    pub async fn write_sections(&self, state: &ResearchState) -> Result<ReportLayout, AgentError> {
        let task = &state.task;
        let guidelines = task
            .follow_guidelines
            .then(|| prompt::join_guidelines(&task.guidelines));
        // The planned title is the topic; the raw query only stands in for a blank one.
        let topic = if state.title.trim().is_empty() {
            &task.query
        } else {
            &state.title
        };
        let user_msg = prompt::build_writer_prompt(
            self.catalog.language(),
            &prompt::today(),
            topic,
            &state.research_data,
            guidelines.as_deref(),
        );
        let layout: ReportLayout =
            execute_structured(self, self.provider.as_ref(), &user_msg, "report_layout").await?;
        debug!(sources = layout.sources.len(), "report layout written");
        Ok(layout)
    }

    /// Rewrites heading labels to follow the task guidelines.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ResponseParse`] for malformed output and
    /// propagates model failures.
    pub async fn revise_headers(&self, task: &Task, headers: &Headers) -> Result<Headers, AgentError> {
        let headers_json = serde_json::to_string(headers).map_err(|e| AgentError::Orchestration {
            message: format!("failed to encode headers: {e}"),
        })?;
        let user_msg = prompt::build_revise_headers_prompt(
            self.catalog.language(),
            &prompt::join_guidelines(&task.guidelines),
            &headers_json,
        );
        execute_structured(self, self.provider.as_ref(), &user_msg, "headers").await
    }

    /// Writes the layout, then picks (and optionally revises) headings.
    ///
    /// # Errors
    ///
    /// Propagates [`WriterAgent::write_sections`] and
    /// [`WriterAgent::revise_headers`] failures.
    pub async fn run(&self, state: &ResearchState) -> Result<(ReportLayout, Headers), AgentError> {
        let task = &state.task;
        self.sink.emit(ProgressEvent::log(
            AGENT,
            "writing_report",
            self.catalog.render(&Message::WritingReport),
        ));

        let layout = self.write_sections(state).await?;
        if task.verbose {
            let dump = serde_json::to_string_pretty(&layout).unwrap_or_default();
            self.sink.emit(ProgressEvent::log(AGENT, "research_layout_content", dump));
        }

        let mut headers = Headers::localized(self.catalog.language(), &state.title);
        if task.follow_guidelines {
            self.sink.emit(ProgressEvent::log(
                AGENT,
                "rewriting_layout",
                self.catalog.render(&Message::RewritingLayout),
            ));
            headers = self.revise_headers(task, &headers).await?;
        }

        Ok((layout, headers))
    }
}

impl std::fmt::Debug for WriterAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterAgent")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl Agent for WriterAgent {
    fn name(&self) -> &'static str {
        "writer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
