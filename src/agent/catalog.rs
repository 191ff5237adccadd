//! Localized progress and prompt strings.
//!
//! Every user-facing message is a [`Message`] variant carrying its typed
//! arguments, so a missing key or a misspelled placeholder is a compile
//! error. A [`Catalog`] is bound to one [`Language`] and lives on the
//! agents that emit messages.

use crate::core::Language;

/// A localizable message with its arguments.
#[derive(Debug, Clone, Copy)]
pub enum Message<'a> {
    /// Run start.
    StartingResearch {
        /// Research query.
        query: &'a str,
    },
    /// Initial broad research.
    InitialResearch {
        /// Research query.
        query: &'a str,
    },
    /// Planner invoked.
    EditorPlanning,
    /// Plan produced.
    PlanReady {
        /// Planned title.
        title: &'a str,
        /// Planned sections.
        sections: &'a [String],
    },
    /// Fan-out dispatched.
    ParallelResearch {
        /// Section topics.
        queries: &'a [String],
    },
    /// One section researched in depth.
    DepthResearch {
        /// Section topic.
        topic: &'a str,
    },
    /// Reviewer started.
    ReviewDraft,
    /// Reviewer guidelines (verbose).
    ReviewGuidelines {
        /// Guidelines as given on the task.
        guidelines: &'a [String],
    },
    /// Reviewer skipped.
    IgnoringGuidelines,
    /// Reviewer output (verbose).
    ReviewFeedback {
        /// Review text.
        response: &'a str,
    },
    /// Reviser started.
    RevisingDraft {
        /// Section topic.
        topic: &'a str,
    },
    /// Revision cap reached.
    RevisionLimit {
        /// Section topic.
        topic: &'a str,
        /// Configured cap.
        max: u32,
    },
    /// Human asked to review the plan.
    HumanFeedbackRequest {
        /// Planned sections.
        layout: &'a [String],
    },
    /// Writer started.
    WritingReport,
    /// Writer revising headers.
    RewritingLayout,
    /// Publisher started.
    Publishing,
    /// Report written to disk.
    ReportPublished {
        /// Output path.
        path: &'a str,
    },
}

/// Formats a list the way progress messages show it: `'a', 'b'`.
fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Message renderer bound to one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Catalog {
    language: Language,
}

impl Catalog {
    /// Creates a catalog for `language`.
    #[must_use]
    pub const fn new(language: Language) -> Self {
        Self { language }
    }

    /// Language this catalog renders.
    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Renders `message` in the catalog's language.
    #[must_use]
    pub fn render(&self, message: &Message<'_>) -> String {
        match self.language {
            Language::En => Self::render_en(message),
            Language::Zh => Self::render_zh(message),
        }
    }

    fn render_en(message: &Message<'_>) -> String {
        match *message {
            Message::StartingResearch { query } => {
                format!("Starting the research process for query '{query}'...")
            }
            Message::InitialResearch { query } => {
                format!("Running initial research on the following query: {query}")
            }
            Message::EditorPlanning => {
                "Planning an outline layout based on initial research...".to_string()
            }
            Message::PlanReady { title, sections } => {
                format!("Planned '{title}' with sections: {}", quoted_list(sections))
            }
            Message::ParallelResearch { queries } => format!(
                "Running parallel research for the following queries: {}",
                quoted_list(queries)
            ),
            Message::DepthResearch { topic } => {
                format!("Running in depth research on the following report topic: {topic}")
            }
            Message::ReviewDraft => "Reviewing draft...".to_string(),
            Message::ReviewGuidelines { guidelines } => {
                format!("Following guidelines {}...", quoted_list(guidelines))
            }
            Message::IgnoringGuidelines => "Ignoring guidelines...".to_string(),
            Message::ReviewFeedback { response } => format!("Review feedback is: {response}..."),
            Message::RevisingDraft { topic } => format!("Revising draft for '{topic}'..."),
            Message::RevisionLimit { topic, max } => format!(
                "Reached {max} revisions for '{topic}', accepting the latest draft"
            ),
            Message::HumanFeedbackRequest { layout } => format!(
                "Any feedback on this plan of topics to research? [{}]? If not, please reply with 'no'.\n>> ",
                quoted_list(layout)
            ),
            Message::WritingReport => {
                "Writing final research report based on research data...".to_string()
            }
            Message::RewritingLayout => "Rewriting layout based on guidelines...".to_string(),
            Message::Publishing => {
                "Publishing final research report based on retrieved data...".to_string()
            }
            Message::ReportPublished { path } => format!("Report written to {path}"),
        }
    }

    fn render_zh(message: &Message<'_>) -> String {
        match *message {
            Message::StartingResearch { query } => format!("开始对查询 “{query}” 进行研究..."),
            Message::InitialResearch { query } => {
                format!("正在对以下查询进行初步研究: {query}")
            }
            Message::EditorPlanning => "根据初步研究规划大纲布局...".to_string(),
            Message::PlanReady { title, sections } => {
                format!("已规划 “{title}”，章节: {}", quoted_list(sections))
            }
            Message::ParallelResearch { queries } => {
                format!("进行以下查询的并行研究: {}", quoted_list(queries))
            }
            Message::DepthResearch { topic } => {
                format!("正在对以下报告主题进行深入研究: {topic}")
            }
            Message::ReviewDraft => "正在审查草稿...".to_string(),
            Message::ReviewGuidelines { guidelines } => {
                format!("遵循以下指南 {}...", quoted_list(guidelines))
            }
            Message::IgnoringGuidelines => "忽略指南...".to_string(),
            Message::ReviewFeedback { response } => format!("审查反馈为: {response}..."),
            Message::RevisingDraft { topic } => format!("正在修订 “{topic}” 的草稿..."),
            Message::RevisionLimit { topic, max } => {
                format!("“{topic}” 已修订 {max} 次，接受最新草稿")
            }
            Message::HumanFeedbackRequest { layout } => format!(
                "对这个研究主题计划（[{}]）有任何反馈吗? 如果没有，请回复“没有”。\n>> ",
                quoted_list(layout)
            ),
            Message::WritingReport => "根据研究数据撰写最终研究报告...".to_string(),
            Message::RewritingLayout => "根据指南重新排版布局...".to_string(),
            Message::Publishing => "基于检索到的数据，正在发布最终研究报告...".to_string(),
            Message::ReportPublished { path } => format!("报告已写入 {path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_english_with_argument() {
        let catalog = Catalog::new(Language::En);
        let msg = catalog.render(&Message::DepthResearch { topic: "Grid storage" });
        assert_eq!(
            msg,
            "Running in depth research on the following report topic: Grid storage"
        );
    }

    #[test]
    fn test_render_chinese() {
        let catalog = Catalog::new(Language::Zh);
        let msg = catalog.render(&Message::StartingResearch { query: "电池" });
        assert!(msg.contains("电池"));
        assert!(msg.starts_with("开始"));
    }

    #[test]
    fn test_render_list_arguments() {
        let catalog = Catalog::new(Language::En);
        let sections = vec!["A".to_string(), "B".to_string()];
        let msg = catalog.render(&Message::ParallelResearch { queries: &sections });
        assert!(msg.ends_with("'A', 'B'"));
    }

    #[test]
    fn test_feedback_request_mentions_opt_out() {
        let layout = vec!["Intro topic".to_string()];
        let en = Catalog::new(Language::En).render(&Message::HumanFeedbackRequest { layout: &layout });
        assert!(en.contains("'no'"));
        let zh = Catalog::new(Language::Zh).render(&Message::HumanFeedbackRequest { layout: &layout });
        assert!(zh.contains("没有"));
    }

    #[test]
    fn test_catalog_language() {
        assert_eq!(Catalog::new(Language::Zh).language(), Language::Zh);
        assert_eq!(Catalog::default().language(), Language::En);
    }
}
