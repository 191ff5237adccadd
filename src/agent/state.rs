//! Run state threaded through the pipeline.
//!
//! [`ResearchState`] is the run-wide accumulator; [`DraftState`] is owned by a
//! single section branch. The remaining types are the structured payloads
//! exchanged with the model, deriving [`JsonSchema`] so they can be requested
//! as strict response formats.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::task::Task;
use crate::core::Language;

/// Outcome of reviewing a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "notes", rename_all = "snake_case")]
pub enum Verdict {
    /// The draft can be published as-is.
    Accepted,
    /// The draft needs another pass guided by these notes.
    NeedsRevision(String),
}

impl Verdict {
    /// Returns `true` for [`Verdict::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Section outline returned by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResearchPlan {
    /// Report title.
    pub title: String,
    /// Report date as written by the planner.
    #[serde(default)]
    pub date: String,
    /// Section headers, most important first.
    #[serde(default)]
    pub sections: Vec<String>,
}

/// Introduction, conclusion and bibliography written around the sections.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReportLayout {
    /// Markdown table of contents.
    #[serde(default)]
    pub table_of_contents: String,
    /// Markdown introduction with hyperlinked sources.
    #[serde(default)]
    pub introduction: String,
    /// Markdown conclusion with hyperlinked sources.
    #[serde(default)]
    pub conclusion: String,
    /// APA-style source list entries.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Labels used for the report's fixed headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Headers {
    /// Report title.
    pub title: String,
    /// Label for the date line.
    pub date: String,
    /// Introduction heading.
    pub introduction: String,
    /// Table of contents heading.
    pub table_of_contents: String,
    /// Conclusion heading.
    pub conclusion: String,
    /// References heading.
    pub references: String,
}

impl Headers {
    /// Default heading labels for `language`.
    #[must_use]
    pub fn localized(language: Language, title: &str) -> Self {
        let (date, introduction, table_of_contents, conclusion, references) = match language {
            Language::En => (
                "Date",
                "Introduction",
                "Table of Contents",
                "Conclusion",
                "References",
            ),
            Language::Zh => ("日期", "介绍", "目录", "结论", "参考文献"),
        };
        Self {
            title: title.to_string(),
            date: date.to_string(),
            introduction: introduction.to_string(),
            table_of_contents: table_of_contents.to_string(),
            conclusion: conclusion.to_string(),
            references: references.to_string(),
        }
    }
}

/// A reviser's rewrite of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Revision {
    /// The revised draft.
    pub draft: String,
    /// What the reviser changed, for the reviewer's next pass.
    pub revision_notes: String,
}

/// One researched section as collected at fan-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDraft {
    /// Section topic (the planned header).
    pub topic: String,
    /// Accepted draft; `None` when research for the topic failed.
    pub content: Option<String>,
}

/// Per-section state owned by one fan-out branch.
#[derive(Debug, Clone)]
pub struct DraftState {
    /// Section topic.
    pub topic: String,
    /// Report title the section belongs to.
    pub title: String,
    /// Run configuration.
    pub task: Arc<Task>,
    /// Current draft text.
    pub draft: Option<String>,
    /// Latest review verdict; `None` before the first review.
    pub review: Option<Verdict>,
    /// Notes from the latest revision.
    pub revision_notes: Option<String>,
    /// Revisions applied so far.
    pub revisions: u32,
}

impl DraftState {
    /// Creates the initial state for one section branch.
    #[must_use]
    pub fn new(task: Arc<Task>, title: &str, topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            title: title.to_string(),
            task,
            draft: None,
            review: None,
            revision_notes: None,
            revisions: 0,
        }
    }

    /// Converts the finished branch into its fan-in record.
    #[must_use]
    pub fn into_section(self) -> SectionDraft {
        SectionDraft {
            topic: self.topic,
            content: self.draft,
        }
    }
}

/// Run-wide accumulator, filled stage by stage.
#[derive(Debug, Clone)]
pub struct ResearchState {
    /// Run configuration.
    pub task: Arc<Task>,
    /// Report produced by the initial broad research pass.
    pub initial_research: String,
    /// Planned title.
    pub title: String,
    /// Planned date.
    pub date: String,
    /// Planned section headers.
    pub sections: Vec<String>,
    /// Human feedback on the plan, if any.
    pub human_feedback: Option<String>,
    /// Accepted section drafts, in plan order.
    pub research_data: Vec<SectionDraft>,
    /// Writer output.
    pub layout: Option<ReportLayout>,
    /// Final heading labels.
    pub headers: Option<Headers>,
}

impl ResearchState {
    /// Creates an empty state for `task`.
    #[must_use]
    pub fn new(task: Arc<Task>) -> Self {
        Self {
            task,
            initial_research: String::new(),
            title: String::new(),
            date: String::new(),
            sections: Vec::new(),
            human_feedback: None,
            research_data: Vec::new(),
            layout: None,
            headers: None,
        }
    }

    /// Records a plan.
    pub fn apply_plan(&mut self, plan: ResearchPlan) {
        self.title = plan.title;
        self.date = plan.date;
        self.sections = plan.sections;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_deserialization_defaults() {
        let plan: ResearchPlan = serde_json::from_str(r#"{"title": "EV Batteries"}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(plan.title, "EV Batteries");
        assert!(plan.sections.is_empty());
        assert!(plan.date.is_empty());
    }

    #[test]
    fn test_headers_localized() {
        let en = Headers::localized(Language::En, "T");
        assert_eq!(en.references, "References");
        let zh = Headers::localized(Language::Zh, "T");
        assert_eq!(zh.conclusion, "结论");
        assert_eq!(zh.title, "T");
    }

    #[test]
    fn test_apply_plan() {
        let mut state = ResearchState::new(Arc::new(Task::new("q")));
        state.apply_plan(ResearchPlan {
            title: "Title".to_string(),
            date: "01/02/2026".to_string(),
            sections: vec!["A".to_string(), "B".to_string()],
        });
        assert_eq!(state.title, "Title");
        assert_eq!(state.sections, vec!["A", "B"]);
    }

    #[test]
    fn test_draft_into_section() {
        let mut draft = DraftState::new(Arc::new(Task::new("q")), "Title", "Topic");
        draft.draft = Some("body".to_string());
        let section = draft.into_section();
        assert_eq!(section.topic, "Topic");
        assert_eq!(section.content.as_deref(), Some("body"));
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_string(&Verdict::NeedsRevision("cite more".to_string()))
            .unwrap_or_default();
        assert!(json.contains("needs_revision"));
        assert!(json.contains("cite more"));
        assert!(Verdict::Accepted.is_accepted());
    }
}
