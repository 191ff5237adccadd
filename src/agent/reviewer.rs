//! Reviewer agent.
//!
//! Reviews a section draft against the task guidelines and returns a typed
//! [`Verdict`]. The model must answer with `{"accepted": bool, "notes": ...}`;
//! anything else is a parse error.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use super::catalog::{Catalog, Message};
use super::progress::{ProgressEvent, ProgressSink};
use super::prompt;
use super::provider::LlmProvider;
use super::state::{DraftState, Verdict};
use super::traits::{Agent, execute_structured};
use crate::error::AgentError;

const AGENT: &str = "REVIEWER";

/// Structured review as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct ReviewResponse {
    /// Whether the draft can be published.
    pub accepted: bool,
    /// Revision notes; required when `accepted` is false.
    #[serde(default)]
    pub notes: Option<String>,
}

impl TryFrom<ReviewResponse> for Verdict {
    type Error = String;

    fn try_from(review: ReviewResponse) -> Result<Self, Self::Error> {
        if review.accepted {
            return Ok(Self::Accepted);
        }
        match review.notes.map(|n| n.trim().to_string()) {
            Some(notes) if !notes.is_empty() => Ok(Self::NeedsRevision(notes)),
            _ => Err("review rejected the draft without revision notes".to_string()),
        }
    }
}

/// Reviews drafts against guidelines.
#[derive(Clone)]
pub struct ReviewerAgent {
    provider: Arc<dyn LlmProvider>,
    sink: Arc<dyn ProgressSink>,
    catalog: Catalog,
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl ReviewerAgent {
    /// Creates a reviewer.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        sink: Arc<dyn ProgressSink>,
        catalog: Catalog,
        model: &str,
        system_prompt: &str,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            sink,
            catalog,
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            max_tokens,
        }
    }

    /// Reviews the branch's current draft.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ResponseParse`] for output that is not a valid
    /// review, and propagates model failures.
    pub async fn review_draft(&self, draft: &DraftState) -> Result<Verdict, AgentError> {
        let task = &draft.task;
        let guidelines = prompt::join_guidelines(&task.guidelines);
        let user_msg = prompt::build_review_prompt(
            self.catalog.language(),
            &guidelines,
            draft.draft.as_deref().unwrap_or_default(),
            draft.revision_notes.as_deref(),
        );

        let review: ReviewResponse =
            execute_structured(self, self.provider.as_ref(), &user_msg, "review").await?;
        debug!(topic = %draft.topic, accepted = review.accepted, "review received");

        if task.verbose {
            let response = review.notes.as_deref().unwrap_or("accepted");
            self.sink.emit(ProgressEvent::log(
                AGENT,
                "review_feedback",
                self.catalog.render(&Message::ReviewFeedback { response }),
            ));
        }

        let raw = format!("{review:?}");
        Verdict::try_from(review).map_err(|message| AgentError::ResponseParse {
            message,
            content: raw,
        })
    }

    /// Reviews the draft when the task follows guidelines.
    ///
    /// Returns `Ok(None)` without calling the model when guidelines are
    /// ignored; the draft is then implicitly accepted.
    ///
    /// # Errors
    ///
    /// Propagates [`ReviewerAgent::review_draft`] failures.
    pub async fn run(&self, draft: &DraftState) -> Result<Option<Verdict>, AgentError> {
        let task = &draft.task;
        if !task.follow_guidelines {
            self.sink.emit(ProgressEvent::log(
                AGENT,
                "ignoring_guidelines",
                self.catalog.render(&Message::IgnoringGuidelines),
            ));
            return Ok(None);
        }

        self.sink.emit(ProgressEvent::log(
            AGENT,
            "review_draft",
            self.catalog.render(&Message::ReviewDraft),
        ));
        if task.verbose {
            self.sink.emit(ProgressEvent::log(
                AGENT,
                "review_guidelines",
                self.catalog.render(&Message::ReviewGuidelines {
                    guidelines: &task.guidelines,
                }),
            ));
        }

        self.review_draft(draft).await.map(Some)
    }
}

impl std::fmt::Debug for ReviewerAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewerAgent")
            .field("model", &self.model)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl Agent for ReviewerAgent {
    fn name(&self) -> &'static str {
        "reviewer"
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
    use crate::agent::task::Task;
    use crate::agent::testing::{RecordingSink, ScriptedProvider};
    use crate::core::Language;
    use test_case::test_case;

    fn reviewer(provider: Arc<ScriptedProvider>, sink: Arc<RecordingSink>) -> ReviewerAgent {
        ReviewerAgent::new(provider, sink, Catalog::new(Language::En), "m", "sys", 512)
    }

    fn draft(follow_guidelines: bool) -> DraftState {
        let mut task = Task::new("EV batteries");
        task.follow_guidelines = follow_guidelines;
        task.guidelines = vec!["Use APA".to_string(), "Be brief".to_string()];
        let mut draft = DraftState::new(Arc::new(task), "Title", "Costs");
        draft.draft = Some("Costs fell.".to_string());
        draft
    }

    #[tokio::test]
    async fn test_run_skips_model_when_guidelines_ignored() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let sink = Arc::new(RecordingSink::default());
        let review = reviewer(Arc::clone(&provider), Arc::clone(&sink))
            .run(&draft(false))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(review.is_none());
        assert_eq!(provider.call_count(), 0);
        assert_eq!(sink.event_types(), vec!["ignoring_guidelines"]);
    }

    #[test_case(r#"{"accepted": true, "notes": null}"#, Some(Verdict::Accepted) ; "accepted")]
    #[test_case(r#"{"accepted": true}"#, Some(Verdict::Accepted) ; "accepted without notes field")]
    #[test_case(r#"{"accepted": false, "notes": "Add citations"}"#, Some(Verdict::NeedsRevision("Add citations".to_string())) ; "needs revision")]
    #[test_case(r#"{"accepted": false, "notes": "  "}"#, None ; "rejected without notes")]
    #[test_case("None", None ; "bare none is not acceptance")]
    #[test_case("The draft is fine. None required.", None ; "prose mentioning none")]
    fn test_review_draft_parsing(response: &str, expected: Option<Verdict>) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = Arc::new(ScriptedProvider::new([response]));
        let result = runtime.block_on(
            reviewer(provider, Arc::new(RecordingSink::default())).review_draft(&draft(true)),
        );
        match expected {
            Some(verdict) => assert_eq!(result.ok(), Some(verdict)),
            None => assert!(matches!(result, Err(AgentError::ResponseParse { .. }))),
        }
    }

    #[tokio::test]
    async fn test_review_prompt_contents() {
        let provider = Arc::new(ScriptedProvider::new([r#"{"accepted": true}"#]));
        let mut state = draft(true);
        state.revision_notes = Some("Added a table".to_string());
        reviewer(Arc::clone(&provider), Arc::new(RecordingSink::default()))
            .review_draft(&state)
            .await
            .unwrap_or_else(|_| unreachable!());

        let sent = provider.requests();
        let user = &sent[0].messages[1].content;
        assert!(user.contains("Use APA- Be brief"));
        assert!(user.contains("Added a table"));
        assert!(user.contains("Costs fell."));
        assert_eq!(sent[0].messages[0].content, "sys");
    }

    #[tokio::test]
    async fn test_verbose_run_emits_guidelines_and_feedback() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"accepted": false, "notes": "More data"}"#,
        ]));
        let sink = Arc::new(RecordingSink::default());
        let mut state = draft(true);
        let mut task = (*state.task).clone();
        task.verbose = true;
        state.task = Arc::new(task);

        let review = reviewer(provider, Arc::clone(&sink))
            .run(&state)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(review, Some(Verdict::NeedsRevision("More data".to_string())));
        assert_eq!(
            sink.event_types(),
            vec!["review_draft", "review_guidelines", "review_feedback"]
        );
    }
}
