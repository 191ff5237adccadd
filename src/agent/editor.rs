//! Editor agent.
//!
//! Plans the report's sections from the initial research, then fans the
//! sections out to concurrent [`ReviewCycle`] branches and collects the
//! accepted drafts in plan order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::catalog::{Catalog, Message};
use super::progress::{ProgressEvent, ProgressSink};
use super::prompt;
use super::provider::LlmProvider;
use super::state::{DraftState, ResearchPlan, ResearchState, SectionDraft};
use super::traits::{Agent, execute_structured};
use super::workflow::ReviewCycle;
use crate::error::AgentError;

const AGENT: &str = "EDITOR";

/// Fan-out limits for [`EditorAgent::run_parallel_research`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutLimits {
    /// Branches running at once.
    pub max_concurrency: usize,
    /// Deadline for one branch, measured from when it starts running.
    pub section_timeout: Duration,
}

/// Plans sections and supervises their research.
#[derive(Clone)]
pub struct EditorAgent {
    provider: Arc<dyn LlmProvider>,
    sink: Arc<dyn ProgressSink>,
    catalog: Catalog,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    limits: FanOutLimits,
    cycle: Arc<ReviewCycle>,
    cancel: CancellationToken,
}

impl EditorAgent {
    /// Creates an editor.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        sink: Arc<dyn ProgressSink>,
        catalog: Catalog,
        model: &str,
        system_prompt: &str,
        max_tokens: u32,
        limits: FanOutLimits,
        cycle: ReviewCycle,
    ) -> Self {
        Self {
            provider,
            sink,
            catalog,
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            max_tokens,
            limits,
            cycle: Arc::new(cycle),
            cancel: CancellationToken::new(),
        }
    }

    /// Cancels all branches when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Plans the report outline.
    ///
    /// Sections beyond the task's `max_sections` are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyPlan`] when no sections come back,
    /// [`AgentError::ResponseParse`] for malformed output, and propagates
    /// model failures.
    pub async fn plan_research(&self, state: &ResearchState) -> Result<ResearchPlan, AgentError> {
        let task = &state.task;
        self.sink.emit(ProgressEvent::log(
            AGENT,
            "planning_research",
            self.catalog.render(&Message::EditorPlanning),
        ));

        let feedback = if task.include_human_feedback {
            state.human_feedback.as_deref()
        } else {
            None
        };
        let date = prompt::today();
        let user_msg = prompt::build_plan_prompt(
            self.catalog.language(),
            &date,
            &state.initial_research,
            feedback,
            task.max_sections,
        );

        let mut plan: ResearchPlan =
            execute_structured(self, self.provider.as_ref(), &user_msg, "research_plan").await?;
        cap_sections(&mut plan, task.max_sections);
        if plan.sections.is_empty() {
            return Err(AgentError::EmptyPlan { title: plan.title });
        }
        if plan.date.trim().is_empty() {
            plan.date = date;
        }

        self.sink.emit(ProgressEvent::log(
            AGENT,
            "plan_ready",
            self.catalog.render(&Message::PlanReady {
                title: &plan.title,
                sections: &plan.sections,
            }),
        ));
        Ok(plan)
    }

    /// Researches every planned section concurrently.
    ///
    /// The result has one entry per section, in plan order, regardless of
    /// completion order. The first branch to fail or time out aborts the rest.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SectionFailed`], [`AgentError::SectionTimeout`]
    /// or [`AgentError::Cancelled`].
    pub async fn run_parallel_research(&self, state: &ResearchState) -> Result<Vec<SectionDraft>, AgentError> {
        self.sink.emit(ProgressEvent::log(
            AGENT,
            "parallel_research",
            self.catalog.render(&Message::ParallelResearch {
                queries: &state.sections,
            }),
        ));
        info!(sections = state.sections.len(), concurrency = self.limits.max_concurrency, "researching sections");

        let semaphore = Arc::new(Semaphore::new(self.limits.max_concurrency.max(1)));
        let mut branches = JoinSet::new();

        for (index, topic) in state.sections.iter().enumerate() {
            let draft = DraftState::new(Arc::clone(&state.task), &state.title, topic);
            let cycle = Arc::clone(&self.cycle);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let after = self.limits.section_timeout;
            let topic = topic.clone();

            branches.spawn(async move {
                let branch = async {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Err(AgentError::Cancelled);
                    };
                    match tokio::time::timeout(after, cycle.run(draft)).await {
                        Ok(Ok(done)) => Ok(done.into_section()),
                        Ok(Err(source)) => Err(AgentError::SectionFailed {
                            topic: topic.clone(),
                            source: Box::new(source),
                        }),
                        Err(_) => Err(AgentError::SectionTimeout {
                            topic: topic.clone(),
                            after,
                        }),
                    }
                };
                let result = tokio::select! {
                    () = cancel.cancelled() => Err(AgentError::Cancelled),
                    r = branch => r,
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<SectionDraft>> = vec![None; state.sections.len()];
        while let Some(joined) = branches.join_next().await {
            let (index, result) = joined.map_err(|e| AgentError::Orchestration {
                message: format!("section task failed to complete: {e}"),
            })?;
            match result {
                Ok(section) => {
                    debug!(index, topic = %section.topic, "section accepted");
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(section);
                    }
                }
                Err(e) => {
                    branches.abort_all();
                    return Err(e);
                }
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| AgentError::Orchestration {
                message: "a section branch finished without a result".to_string(),
            })
    }
}

/// Truncates a plan to `max_sections`, dropping blank headers first.
pub fn cap_sections(plan: &mut ResearchPlan, max_sections: usize) {
    plan.sections.retain(|s| !s.trim().is_empty());
    plan.sections.truncate(max_sections);
}

impl std::fmt::Debug for EditorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorAgent")
            .field("model", &self.model)
            .field("limits", &self.limits)
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl Agent for EditorAgent {
    fn name(&self) -> &'static str {
        "editor"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::ChatRequest;
    use crate::agent::researcher::{ResearchAgent, ResearchRequest, Researcher};
    use crate::agent::reviewer::ReviewerAgent;
    use crate::agent::reviser::ReviserAgent;
    use crate::agent::task::Task;
    use crate::agent::testing::{EchoResearcher, FnProvider, RecordingSink};
    use crate::core::Language;
    use async_trait::async_trait;
    use proptest::prelude::*;

    /// Researcher whose latency shrinks with position, so later sections
    /// finish first.
    struct StaggeredResearcher {
        delay: Duration,
    }

    #[async_trait]
    impl Researcher for StaggeredResearcher {
        async fn conduct(&self, request: &ResearchRequest) -> Result<String, AgentError> {
            let rank: u32 = request
                .query
                .rsplit(' ')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or_default();
            let wait = self.delay.saturating_sub(Duration::from_millis(u64::from(rank) * 10));
            tokio::time::sleep(wait).await;
            Ok(format!("body of {}", request.query))
        }
    }

    fn editor_with(
        researcher: Arc<dyn Researcher>,
        provider: Arc<FnProvider>,
        limits: FanOutLimits,
    ) -> EditorAgent {
        let sink: Arc<RecordingSink> = Arc::new(RecordingSink::default());
        let catalog = Catalog::new(Language::En);
        let cycle = ReviewCycle::new(
            ResearchAgent::new(researcher, sink.clone(), catalog),
            ReviewerAgent::new(provider.clone(), sink.clone(), catalog, "m", "review", 256),
            ReviserAgent::new(provider.clone(), sink.clone(), catalog, "m", "revise", 256),
            sink.clone(),
            catalog,
            2,
        );
        EditorAgent::new(provider, sink, catalog, "m", "editor", 256, limits, cycle)
    }

    fn limits() -> FanOutLimits {
        FanOutLimits {
            max_concurrency: 4,
            section_timeout: Duration::from_secs(5),
        }
    }

    fn planned_state(sections: &[&str]) -> ResearchState {
        let mut state = ResearchState::new(Arc::new(Task::new("EV batteries")));
        state.title = "EV Batteries".to_string();
        state.sections = sections.iter().map(ToString::to_string).collect();
        state
    }

    fn plan_reply(
        sections: usize,
    ) -> impl Fn(&ChatRequest) -> Result<String, AgentError> + Send + Sync + 'static {
        move |_| {
            let sections: Vec<String> = (1..=sections).map(|i| format!("Section {i}")).collect();
            Ok(serde_json::json!({"title": "EV Batteries", "date": "", "sections": sections}).to_string())
        }
    }

    #[tokio::test]
    async fn test_plan_caps_sections() {
        let provider = Arc::new(FnProvider::new(plan_reply(6)));
        let editor = editor_with(Arc::new(EchoResearcher::default()), provider, limits());
        let mut state = ResearchState::new(Arc::new(Task::new("q")));
        state.initial_research = "summary".to_string();

        let plan = editor.plan_research(&state).await.unwrap_or_else(|_| unreachable!());
        assert_eq!(plan.sections.len(), 3);
        assert_eq!(plan.sections[0], "Section 1");
        assert!(!plan.date.is_empty());
    }

    #[tokio::test]
    async fn test_empty_plan_is_error() {
        let provider = Arc::new(FnProvider::new(plan_reply(0)));
        let editor = editor_with(Arc::new(EchoResearcher::default()), provider, limits());
        let state = ResearchState::new(Arc::new(Task::new("q")));
        let result = editor.plan_research(&state).await;
        assert!(matches!(result, Err(AgentError::EmptyPlan { ref title }) if title == "EV Batteries"));
    }

    #[tokio::test]
    async fn test_plan_includes_feedback_only_when_enabled() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let provider = Arc::new(FnProvider::new(move |request| {
            if let Ok(mut seen) = record.lock() {
                seen.push(request.messages[1].content.clone());
            }
            plan_reply(2)(request)
        }));
        let editor = editor_with(Arc::new(EchoResearcher::default()), provider, limits());

        let mut task = Task::new("q");
        task.include_human_feedback = true;
        let mut state = ResearchState::new(Arc::new(task));
        state.human_feedback = Some("focus on recycling".to_string());
        editor.plan_research(&state).await.unwrap_or_else(|_| unreachable!());

        state.task = Arc::new(Task::new("q"));
        editor.plan_research(&state).await.unwrap_or_else(|_| unreachable!());

        let prompts = seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert!(prompts[0].contains("focus on recycling"));
        assert!(!prompts[1].contains("focus on recycling"));
    }

    #[tokio::test]
    async fn test_parallel_research_preserves_order() {
        let provider = Arc::new(FnProvider::new(|_| unreachable!("no review expected")));
        let researcher = Arc::new(StaggeredResearcher {
            delay: Duration::from_millis(60),
        });
        let editor = editor_with(researcher, provider, limits());
        let state = planned_state(&["Topic 1", "Topic 2", "Topic 3", "Topic 4"]);

        let sections = editor
            .run_parallel_research(&state)
            .await
            .unwrap_or_else(|_| unreachable!());
        let topics: Vec<&str> = sections.iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(topics, vec!["Topic 1", "Topic 2", "Topic 3", "Topic 4"]);
        assert_eq!(sections[2].content.as_deref(), Some("body of Topic 3"));
    }

    #[tokio::test]
    async fn test_failed_subtopic_keeps_its_slot() {
        let provider = Arc::new(FnProvider::new(|_| unreachable!("no review expected")));
        let editor = editor_with(Arc::new(EchoResearcher::default()), provider, limits());
        let state = planned_state(&["Costs", "fail: Supply", "Safety"]);

        let sections = editor
            .run_parallel_research(&state)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(sections.len(), 3);
        assert!(sections[1].content.is_none());
        assert!(sections[2].content.is_some());
    }

    #[tokio::test]
    async fn test_slow_branch_times_out() {
        let provider = Arc::new(FnProvider::new(|_| unreachable!("no review expected")));
        let researcher = Arc::new(StaggeredResearcher {
            delay: Duration::from_secs(30),
        });
        let editor = editor_with(
            researcher,
            provider,
            FanOutLimits {
                max_concurrency: 2,
                section_timeout: Duration::from_millis(50),
            },
        );
        let state = planned_state(&["Topic 0"]);

        let result = editor.run_parallel_research(&state).await;
        assert!(matches!(
            result,
            Err(AgentError::SectionTimeout { ref topic, .. }) if topic == "Topic 0"
        ));
    }

    #[tokio::test]
    async fn test_branch_error_fails_group() {
        let mut task = Task::new("EV batteries");
        task.follow_guidelines = true;
        let provider = Arc::new(FnProvider::new(|_| Ok("garbled".to_string())));
        let editor = editor_with(Arc::new(EchoResearcher::default()), provider, limits());
        let mut state = planned_state(&["Costs", "Safety"]);
        state.task = Arc::new(task);

        let result = editor.run_parallel_research(&state).await;
        assert!(matches!(result, Err(AgentError::SectionFailed { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_stops_branches() {
        let provider = Arc::new(FnProvider::new(|_| unreachable!("no review expected")));
        let researcher = Arc::new(StaggeredResearcher {
            delay: Duration::from_secs(30),
        });
        let token = CancellationToken::new();
        let editor = editor_with(researcher, provider, limits()).with_cancellation(token.clone());
        token.cancel();

        let result = editor.run_parallel_research(&planned_state(&["Topic 0"])).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
    }

    proptest! {
        #[test]
        fn prop_cap_sections_never_exceeds_max(
            sections in proptest::collection::vec("[a-z ]{0,12}", 0..12),
            max in 1usize..8,
        ) {
            let mut plan = ResearchPlan {
                title: "t".to_string(),
                date: String::new(),
                sections: sections.clone(),
            };
            cap_sections(&mut plan, max);
            prop_assert!(plan.sections.len() <= max);
            prop_assert!(plan.sections.iter().all(|s| !s.trim().is_empty()));
            let kept: Vec<String> = sections.into_iter().filter(|s| !s.trim().is_empty()).take(max).collect();
            prop_assert_eq!(plan.sections, kept);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_parallel_research_keeps_plan_order(count in 1usize..7, concurrency in 1usize..4) {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap_or_else(|_| unreachable!());
            let provider = Arc::new(FnProvider::new(|_| unreachable!("no review expected")));
            let researcher = Arc::new(StaggeredResearcher { delay: Duration::from_millis(40) });
            let editor = editor_with(researcher, provider, FanOutLimits {
                max_concurrency: concurrency,
                section_timeout: Duration::from_secs(5),
            });
            let names: Vec<String> = (0..count).map(|i| format!("Topic {i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let state = planned_state(&refs);

            let sections = runtime
                .block_on(editor.run_parallel_research(&state))
                .unwrap_or_else(|_| unreachable!());
            let topics: Vec<String> = sections.into_iter().map(|s| s.topic).collect();
            prop_assert_eq!(topics, names);
        }
    }
}
