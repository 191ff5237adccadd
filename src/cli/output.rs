//! Output formatting for CLI commands.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::agent::RunOutcome;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, defaulting to text for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize>(&self, value: &T) -> String {
        serde_json::to_string_pretty(value).map_or_else(
            |e| format!("{{\"error\": \"serialization failed: {e}\"}}\n"),
            |s| s + "\n",
        )
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    #[serde(flatten)]
    outcome: &'a RunOutcome,
    markdown: String,
    published: &'a [PathBuf],
}

/// Formats a finished run.
///
/// Text output is the markdown report followed by a one-line summary.
#[must_use]
pub fn format_outcome(outcome: &RunOutcome, published: &[PathBuf], format: OutputFormat) -> String {
    let markdown = outcome.report.to_markdown();
    match format {
        OutputFormat::Text => {
            let mut output = markdown;
            let _ = write!(
                output,
                "\n---\nSections: {} ({} empty) | Calls: {} | Tokens: {} | Time: {:.1}s",
                outcome.report.sections.len(),
                outcome
                    .report
                    .sections
                    .iter()
                    .filter(|s| s.content.is_none())
                    .count(),
                outcome.usage.calls,
                outcome.usage.total_tokens,
                outcome.elapsed.as_secs_f64()
            );
            for path in published {
                let _ = write!(output, "\nWritten: {}", path.display());
            }
            output.push('\n');
            output
        }
        OutputFormat::Json => format.to_json(&RunSummary {
            outcome,
            markdown,
            published,
        }),
    }
}
