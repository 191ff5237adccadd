//! Final report assembly and publishing.
//!
//! [`FinalReport`] gathers the writer output, the localized headings and
//! the accepted sections. [`Publisher`] renders it and writes one file per
//! requested [`DocumentFormat`] into an output directory.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use unicode_segmentation::UnicodeSegmentation;

use super::catalog::{Catalog, Message};
use super::progress::{EventCategory, ProgressEvent, ProgressSink};
use super::state::{Headers, ReportLayout, ResearchState, SectionDraft};
use crate::core::Language;
use crate::error::AgentError;

const AGENT: &str = "PUBLISHER";
const MAX_SLUG_CHARS: usize = 60;

/// The finished report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalReport {
    /// Query the report answers.
    pub query: String,
    /// Report title.
    pub title: String,
    /// Report date.
    pub date: String,
    /// Report language.
    pub language: Language,
    /// Heading labels.
    pub headers: Headers,
    /// Introduction, conclusion, contents and sources.
    pub layout: ReportLayout,
    /// Accepted sections in plan order.
    pub sections: Vec<SectionDraft>,
}

impl FinalReport {
    /// Assembles the report from a finished run.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] if the writer has not filled in
    /// the layout and headings yet.
    pub fn from_state(state: ResearchState) -> Result<Self, AgentError> {
        let (Some(layout), Some(headers)) = (state.layout, state.headers) else {
            return Err(AgentError::Orchestration {
                message: "report is missing its layout or headers".to_string(),
            });
        };
        Ok(Self {
            query: state.task.query.clone(),
            title: state.title,
            date: state.date,
            language: state.task.language,
            headers,
            layout,
            sections: state.research_data,
        })
    }

    /// Renders the report as markdown. Sections without content are skipped.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let h = &self.headers;
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", h.title);
        let _ = writeln!(out, "#### {}: {}\n", h.date, self.date);
        let _ = writeln!(out, "## {}\n", h.table_of_contents);
        let _ = writeln!(out, "{}\n", self.layout.table_of_contents.trim());
        let _ = writeln!(out, "## {}\n", h.introduction);
        let _ = writeln!(out, "{}\n", self.layout.introduction.trim());

        for content in self.sections.iter().filter_map(|s| s.content.as_deref()) {
            let _ = writeln!(out, "{}\n", content.trim());
        }

        let _ = writeln!(out, "## {}\n", h.conclusion);
        let _ = writeln!(out, "{}\n", self.layout.conclusion.trim());
        let _ = writeln!(out, "## {}\n", h.references);
        for source in &self.layout.sources {
            let _ = writeln!(out, "{}", source.trim());
        }
        out
    }

    /// File stem derived from the title.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }
}

/// Lowercases `title` and joins its alphanumeric runs with `-`.
///
/// The slug is cut at a word boundary to at most 60 graphemes; a single
/// longer word is cut mid-word. Falls back to `"report"` when nothing
/// usable remains.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut len = 0;
    for word in title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        let word_len = word.graphemes(true).count();
        let needed = word_len + usize::from(len > 0);
        if len + needed > MAX_SLUG_CHARS {
            if len == 0 {
                slug = word.graphemes(true).take(MAX_SLUG_CHARS).collect();
            }
            break;
        }
        if len > 0 {
            slug.push('-');
        }
        slug.push_str(&word);
        len += needed;
    }
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}

/// Output document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// `.md` rendering.
    Markdown,
    /// `.json` dump of [`FinalReport`].
    Json,
}

impl DocumentFormat {
    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown document format '{other}' (expected md or json)")),
        }
    }
}

/// Writes finished reports to disk.
#[derive(Clone)]
pub struct Publisher {
    sink: Arc<dyn ProgressSink>,
    catalog: Catalog,
}

impl Publisher {
    /// Creates a publisher.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>, catalog: Catalog) -> Self {
        Self { sink, catalog }
    }

    /// Writes `report` into `dir` once per format and returns the paths.
    ///
    /// Existing files with the same name are replaced.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Publish`] if the directory or a file cannot be
    /// written.
    pub async fn publish(
        &self,
        report: &FinalReport,
        dir: &Path,
        formats: &[DocumentFormat],
    ) -> Result<Vec<PathBuf>, AgentError> {
        self.sink.emit(ProgressEvent::log(
            AGENT,
            "publishing",
            self.catalog.render(&Message::Publishing),
        ));

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| AgentError::Publish {
                path: dir.display().to_string(),
                source,
            })?;

        let slug = report.slug();
        let mut written = Vec::with_capacity(formats.len());
        for format in formats {
            let path = dir.join(format!("{slug}.{}", format.extension()));
            let body = match format {
                DocumentFormat::Markdown => report.to_markdown(),
                DocumentFormat::Json => serde_json::to_string_pretty(report).map_err(|e| {
                    AgentError::Orchestration {
                        message: format!("failed to encode report: {e}"),
                    }
                })?,
            };
            tokio::fs::write(&path, body)
                .await
                .map_err(|source| AgentError::Publish {
                    path: path.display().to_string(),
                    source,
                })?;
            info!(path = %path.display(), "report published");
            self.sink.emit(ProgressEvent {
                category: EventCategory::Report,
                event_type: "report_published",
                message: self.catalog.render(&Message::ReportPublished {
                    path: &path.display().to_string(),
                }),
                agent: AGENT,
            });
            written.push(path);
        }
        Ok(written)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
