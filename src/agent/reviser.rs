//! Reviser agent: rewrites a draft to address reviewer notes.

use std::sync::Arc;

use super::catalog::{Catalog, Message};
use super::progress::{ProgressEvent, ProgressSink};
use super::prompt;
use super::provider::LlmProvider;
use super::state::{DraftState, Revision, Verdict};
use super::traits::{Agent, execute_structured};
use crate::error::AgentError;

const AGENT: &str = "REVISER";

/// Revises drafts.
#[derive(Clone)]
pub struct ReviserAgent {
    provider: Arc<dyn LlmProvider>,
    sink: Arc<dyn ProgressSink>,
    catalog: Catalog,
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl ReviserAgent {
    /// Creates a reviser.
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

    /// Rewrites the branch draft following the latest review notes.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] if the branch has no pending
    /// revision request, [`AgentError::ResponseParse`] for malformed output,
    /// and propagates model failures.
    pub async fn revise(&self, draft: &DraftState) -> Result<Revision, AgentError> {
        let Some(Verdict::NeedsRevision(notes)) = &draft.review else {
            return Err(AgentError::Orchestration {
                message: format!("no revision requested for '{}'", draft.topic),
            });
        };

        self.sink.emit(ProgressEvent::log(
            AGENT,
            "revising_draft",
            self.catalog.render(&Message::RevisingDraft { topic: &draft.topic }),
        ));

        let user_msg = prompt::build_revise_prompt(
            self.catalog.language(),
            draft.draft.as_deref().unwrap_or_default(),
            notes,
        );
        let revision: Revision =
            execute_structured(self, self.provider.as_ref(), &user_msg, "revision").await?;

        if revision.draft.trim().is_empty() {
            return Err(AgentError::ResponseParse {
                message: format!("reviser returned an empty draft for '{}'", draft.topic),
                content: revision.revision_notes,
            });
        }

        if draft.task.verbose {
            self.sink.emit(ProgressEvent::log(
                AGENT,
                "revision_notes",
                revision.revision_notes.clone(),
            ));
        }
        Ok(revision)
    }
}

impl std::fmt::Debug for ReviserAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviserAgent")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Agent for ReviserAgent {
    fn name(&self) -> &'static str {
        "reviser"
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

    fn reviser(provider: Arc<ScriptedProvider>) -> ReviserAgent {
        ReviserAgent::new(
            provider,
            Arc::new(RecordingSink::default()),
            Catalog::new(Language::En),
            "m",
            "sys",
            1024,
        )
    }

    fn pending(notes: &str) -> DraftState {
        let mut draft = DraftState::new(Arc::new(Task::new("q")), "T", "Costs");
        draft.draft = Some("old draft".to_string());
        draft.review = Some(Verdict::NeedsRevision(notes.to_string()));
        draft
    }

    #[tokio::test]
    async fn test_revise_returns_new_draft() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"draft": "new draft", "revision_notes": "added sources"}"#,
        ]));
        let revision = reviser(Arc::clone(&provider))
            .revise(&pending("cite sources"))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(revision.draft, "new draft");
        assert_eq!(revision.revision_notes, "added sources");

        let user = &provider.requests()[0].messages[1].content;
        assert!(user.contains("old draft"));
        assert!(user.contains("cite sources"));
    }

    #[tokio::test]
    async fn test_revise_without_request_is_error() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let mut draft = pending("x");
        draft.review = Some(Verdict::Accepted);
        let result = reviser(Arc::clone(&provider)).revise(&draft).await;
        assert!(matches!(result, Err(AgentError::Orchestration { .. })));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_revise_rejects_empty_draft() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"draft": "", "revision_notes": "nothing"}"#,
        ]));
        let result = reviser(provider).revise(&pending("x")).await;
        assert!(matches!(result, Err(AgentError::ResponseParse { .. })));
    }
}
