//! Chief editor: runs one report from query to finished document.
//!
//! Coordinates the full pipeline: initial research → plan → human review
//! of the plan → parallel section research → writer. Publishing is left to
//! the caller so the same run can feed a file, a socket or stdout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::catalog::{Catalog, Message};
use super::config::ReportConfig;
use super::editor::{EditorAgent, FanOutLimits};
use super::human::{FeedbackSource, HumanAgent, NoFeedback};
use super::progress::{ConsoleSink, ProgressEvent, ProgressSink};
use super::prompt::PromptSet;
use super::provider::{LlmProvider, MeteredProvider, UsageMeter, UsageTotals};
use super::publisher::FinalReport;
use super::researcher::{LlmResearcher, ResearchAgent, Researcher};
use super::reviewer::ReviewerAgent;
use super::reviser::ReviserAgent;
use super::state::ResearchState;
use super::task::Task;
use super::workflow::ReviewCycle;
use super::writer::WriterAgent;
use crate::error::AgentError;

const AGENT: &str = "CHIEF_EDITOR";

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// The finished report.
    pub report: FinalReport,
    /// Wall-clock duration of the run.
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Token usage across every model call of the run.
    pub usage: UsageTotals,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// The agents wired for one run.
struct Crew {
    catalog: Catalog,
    research: ResearchAgent,
    editor: EditorAgent,
    human: HumanAgent,
    writer: WriterAgent,
}

/// Runs report tasks against one provider.
pub struct Orchestrator {
    config: ReportConfig,
    provider: Arc<dyn LlmProvider>,
    sink: Arc<dyn ProgressSink>,
    feedback: Arc<dyn FeedbackSource>,
    researcher: Option<Arc<dyn Researcher>>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Creates an orchestrator logging progress to the console and
    /// without a human feedback channel.
    #[must_use]
    pub fn new(config: ReportConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            config,
            provider,
            sink: Arc::new(ConsoleSink),
            feedback: Arc::new(NoFeedback),
            researcher: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Sends progress events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Reads plan feedback from `source`.
    #[must_use]
    pub fn with_feedback(mut self, source: Arc<dyn FeedbackSource>) -> Self {
        self.feedback = source;
        self
    }

    /// Replaces the model-backed researcher.
    #[must_use]
    pub fn with_researcher(mut self, researcher: Arc<dyn Researcher>) -> Self {
        self.researcher = Some(researcher);
        self
    }

    /// Aborts runs when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs `task` to a finished report.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for an invalid task,
    /// [`AgentError::Cancelled`] when the run is cancelled, and propagates
    /// any stage failure.
    pub async fn run(&self, task: Task) -> Result<RunOutcome, AgentError> {
        task.validate()?;
        let task = Arc::new(task);
        let start = Instant::now();

        let meter = Arc::new(UsageMeter::default());
        let provider: Arc<dyn LlmProvider> = Arc::new(MeteredProvider::new(
            Arc::clone(&self.provider),
            Arc::clone(&meter),
        ));
        let crew = self.assemble(&task, provider);

        let report = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                warn!("run cancelled");
                return Err(AgentError::Cancelled);
            }
            result = self.pipeline(&crew, task) => result?,
        };

        let outcome = RunOutcome {
            report,
            elapsed: start.elapsed(),
            usage: meter.totals(),
        };
        info!(
            elapsed = ?outcome.elapsed,
            calls = outcome.usage.calls,
            tokens = outcome.usage.total_tokens,
            "report complete"
        );
        Ok(outcome)
    }

    fn assemble(&self, task: &Task, provider: Arc<dyn LlmProvider>) -> Crew {
        let config = &self.config;
        let catalog = Catalog::new(task.language);
        let prompts = PromptSet::load(config.prompt_dir.as_deref(), task.language);
        let model = task.model_or(&config.default_model);

        let researcher = self.researcher.clone().unwrap_or_else(|| {
            Arc::new(LlmResearcher::new(
                Arc::clone(&provider),
                config,
                model,
                &prompts.researcher,
            ))
        });
        let research = ResearchAgent::new(researcher, Arc::clone(&self.sink), catalog);
        let reviewer = ReviewerAgent::new(
            Arc::clone(&provider),
            Arc::clone(&self.sink),
            catalog,
            model,
            &prompts.reviewer,
            config.editor_max_tokens,
        );
        let reviser = ReviserAgent::new(
            Arc::clone(&provider),
            Arc::clone(&self.sink),
            catalog,
            model,
            &prompts.reviser,
            config.writer_max_tokens,
        );
        let cycle = ReviewCycle::new(
            research.clone(),
            reviewer,
            reviser,
            Arc::clone(&self.sink),
            catalog,
            config.max_revisions,
        );
        let editor = EditorAgent::new(
            Arc::clone(&provider),
            Arc::clone(&self.sink),
            catalog,
            model,
            &prompts.editor,
            config.editor_max_tokens,
            FanOutLimits {
                max_concurrency: config.max_concurrency,
                section_timeout: config.section_timeout,
            },
            cycle,
        )
        .with_cancellation(self.cancel.child_token());
        let human = HumanAgent::new(Arc::clone(&self.feedback), catalog, config.feedback_timeout);
        let writer = WriterAgent::new(
            provider,
            Arc::clone(&self.sink),
            catalog,
            model,
            &prompts.writer,
            config.writer_max_tokens,
            config.temperature,
        );

        Crew {
            catalog,
            research,
            editor,
            human,
            writer,
        }
    }

    async fn pipeline(&self, crew: &Crew, task: Arc<Task>) -> Result<FinalReport, AgentError> {
        self.sink.emit(ProgressEvent::log(
            AGENT,
            "starting_research",
            crew.catalog.render(&Message::StartingResearch { query: &task.query }),
        ));

        let mut state = ResearchState::new(task);
        state.initial_research = crew.research.run_initial_research(&state).await?;

        let plan = crew.editor.plan_research(&state).await?;
        state.apply_plan(plan);

        // Re-plan while the human keeps asking for changes.
        let mut rounds = 0;
        while rounds < self.config.max_plan_revisions {
            let Some(feedback) = crew.human.review_plan(&state).await else {
                break;
            };
            info!(round = rounds + 1, "re-planning with human feedback");
            state.human_feedback = Some(feedback);
            let plan = crew.editor.plan_research(&state).await?;
            state.apply_plan(plan);
            rounds += 1;
        }

        state.research_data = crew.editor.run_parallel_research(&state).await?;

        let (layout, headers) = crew.writer.run(&state).await?;
        state.layout = Some(layout);
        state.headers = Some(headers);
        FinalReport::from_state(state)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
