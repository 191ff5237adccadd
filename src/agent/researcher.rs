//! Research agent.
//!
//! [`ResearchAgent`] adapts run state into research requests and reports
//! progress. The research itself is delegated to a [`Researcher`]; the
//! default [`LlmResearcher`] derives a few search angles from the query and
//! then writes a markdown report in one model call.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::catalog::{Catalog, Message};
use super::config::ReportConfig;
use super::progress::{ProgressEvent, ProgressSink};
use super::prompt::{self, ResearchPromptArgs};
use super::provider::LlmProvider;
use super::state::{DraftState, ResearchState, SectionDraft};
use super::task::{ReportSource, Task};
use super::traits::{Agent, execute_structured};
use crate::core::Language;
use crate::error::AgentError;

const AGENT: &str = "RESEARCHER";

/// Kind of report a research call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Full report answering the run query.
    Research,
    /// Report on one section topic under a parent query.
    Subtopic,
}

impl ReportKind {
    /// Wire name of the report kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research_report",
            Self::Subtopic => "subtopic_report",
        }
    }
}

/// One research-and-write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    /// Query or subtopic to research.
    pub query: String,
    /// Report kind.
    pub kind: ReportKind,
    /// Parent query for subtopic reports.
    pub parent_query: Option<String>,
    /// Where sources come from.
    pub source: ReportSource,
    /// Writing tone.
    pub tone: Option<String>,
    /// Report language.
    pub language: Language,
    /// Whether intermediate output should be logged.
    pub verbose: bool,
}

impl ResearchRequest {
    /// Builds a request for `query` using the task's source, tone and language.
    #[must_use]
    pub fn for_task(task: &Task, query: &str, kind: ReportKind, parent_query: Option<&str>) -> Self {
        Self {
            query: query.to_string(),
            kind,
            parent_query: parent_query.map(str::to_string),
            source: task.source,
            tone: task.tone.clone(),
            language: task.language,
            verbose: task.verbose,
        }
    }
}

/// External research-and-write collaborator.
///
/// Implementations gather material for a query and return a markdown
/// report. Errors propagate to the caller.
#[async_trait]
pub trait Researcher: Send + Sync {
    /// Researches `request.query` and writes a report.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when research or writing fails.
    async fn conduct(&self, request: &ResearchRequest) -> Result<String, AgentError>;
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchQueries {
    queries: Vec<String>,
}

/// Default researcher backed by the chat model.
pub struct LlmResearcher {
    provider: Arc<dyn LlmProvider>,
    model: String,
    system_prompt: String,
    max_subqueries: usize,
    max_tokens: u32,
    temperature: f32,
}

impl LlmResearcher {
    /// Creates a researcher using `model` and the configured limits.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: &ReportConfig,
        model: &str,
        system_prompt: &str,
    ) -> Self {
        Self {
            provider,
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            max_subqueries: config.max_subqueries,
            max_tokens: config.research_max_tokens,
            temperature: config.temperature,
        }
    }

    /// Generates up to `max_subqueries` search angles.
    ///
    /// Unparseable output degrades to researching the query alone.
    async fn search_angles(&self, request: &ResearchRequest, date: &str) -> Result<Vec<String>, AgentError> {
        if self.max_subqueries == 0 {
            return Ok(vec![request.query.clone()]);
        }
        let user_msg = prompt::build_subquery_prompt(
            &request.query,
            request.parent_query.as_deref(),
            self.max_subqueries,
            date,
        );
        match execute_structured::<SearchQueries>(self, self.provider.as_ref(), &user_msg, "search_queries").await {
            Ok(parsed) => {
                let mut queries: Vec<String> = parsed
                    .queries
                    .into_iter()
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
                    .collect();
                queries.truncate(self.max_subqueries);
                if queries.is_empty() {
                    queries.push(request.query.clone());
                }
                Ok(queries)
            }
            Err(AgentError::ResponseParse { message, .. }) => {
                warn!(query = %request.query, %message, "search angles unparseable, using the query alone");
                Ok(vec![request.query.clone()])
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for LlmResearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmResearcher")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_subqueries", &self.max_subqueries)
            .finish_non_exhaustive()
    }
}

impl Agent for LlmResearcher {
    fn name(&self) -> &'static str {
        "researcher"
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

#[async_trait]
impl Researcher for LlmResearcher {
    async fn conduct(&self, request: &ResearchRequest) -> Result<String, AgentError> {
        let date = prompt::today();
        let angles = self.search_angles(request, &date).await?;
        debug!(query = %request.query, kind = request.kind.as_str(), angles = angles.len(), "writing research report");

        let parent_query = match request.kind {
            ReportKind::Research => None,
            ReportKind::Subtopic => request.parent_query.as_deref(),
        };
        let user_msg = prompt::build_research_prompt(&ResearchPromptArgs {
            query: &request.query,
            parent_query,
            angles: &angles,
            source: request.source.as_str(),
            tone: request.tone.as_deref(),
            language: request.language,
            date: &date,
        });

        let response = self.execute(self.provider.as_ref(), &user_msg).await?;
        let report = response.content.trim();
        if report.is_empty() {
            return Err(AgentError::ResponseParse {
                message: format!("empty report for '{}'", request.query),
                content: response.content,
            });
        }
        Ok(report.to_string())
    }
}

/// Runs research for the initial pass and for each section branch.
#[derive(Clone)]
pub struct ResearchAgent {
    researcher: Arc<dyn Researcher>,
    sink: Arc<dyn ProgressSink>,
    catalog: Catalog,
}

impl ResearchAgent {
    /// Creates an agent delegating to `researcher`.
    #[must_use]
    pub fn new(researcher: Arc<dyn Researcher>, sink: Arc<dyn ProgressSink>, catalog: Catalog) -> Self {
        Self {
            researcher,
            sink,
            catalog,
        }
    }

    /// Researches `query` and returns the report text.
    ///
    /// # Errors
    ///
    /// Propagates any [`Researcher`] failure.
    pub async fn research(&self, request: &ResearchRequest) -> Result<String, AgentError> {
        self.researcher.conduct(request).await
    }

    /// Researches one subtopic. Never fails: a failure is logged and
    /// yields a section without content.
    pub async fn run_subtopic_research(&self, task: &Task, subtopic: &str) -> SectionDraft {
        let request = ResearchRequest::for_task(task, subtopic, ReportKind::Subtopic, Some(&task.query));
        let content = match self.research(&request).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(topic = subtopic, error = %e, "error researching topic");
                None
            }
        };
        SectionDraft {
            topic: subtopic.to_string(),
            content,
        }
    }

    /// Runs the broad first pass over the task query.
    ///
    /// # Errors
    ///
    /// Propagates researcher failures; without initial research there is
    /// nothing to plan from.
    pub async fn run_initial_research(&self, state: &ResearchState) -> Result<String, AgentError> {
        let task = &state.task;
        self.sink.emit(ProgressEvent::log(
            AGENT,
            "initial_research",
            self.catalog.render(&Message::InitialResearch { query: &task.query }),
        ));
        let request = ResearchRequest::for_task(task, &task.query, ReportKind::Research, None);
        self.research(&request).await
    }

    /// Researches the section a branch owns.
    pub async fn run_depth_research(&self, draft: &DraftState) -> SectionDraft {
        self.sink.emit(ProgressEvent::log(
            AGENT,
            "depth_research",
            self.catalog.render(&Message::DepthResearch { topic: &draft.topic }),
        ));
        self.run_subtopic_research(&draft.task, &draft.topic).await
    }
}

impl std::fmt::Debug for ResearchAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchAgent")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
