//! Research task definition.
//!
//! A [`Task`] is the immutable configuration bag for one report run. It can
//! be loaded from a JSON task file or assembled by the CLI.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Language;
use crate::error::AgentError;

/// Where the researcher is expected to draw material from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    /// Public web sources.
    #[default]
    Web,
    /// Local documents supplied by the caller.
    Local,
    /// Both web and local documents.
    Hybrid,
}

impl ReportSource {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Local => "local",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::str::FromStr for ReportSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "local" => Ok(Self::Local),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!(
                "unknown source '{other}' (expected web, local or hybrid)"
            )),
        }
    }
}

impl std::fmt::Display for ReportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_max_sections() -> usize {
    3
}

/// Configuration for a single report run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// The research question.
    pub query: String,
    /// Model identifier; `None` uses the configured default.
    #[serde(default)]
    pub model: Option<String>,
    /// Upper bound on planned sections.
    #[serde(default = "default_max_sections")]
    pub max_sections: usize,
    /// Ordered style/content constraints.
    #[serde(default)]
    pub guidelines: Vec<String>,
    /// Whether drafts are reviewed against the guidelines.
    #[serde(default)]
    pub follow_guidelines: bool,
    /// Emit intermediate model output as progress events.
    #[serde(default)]
    pub verbose: bool,
    /// Ask a human to review the section plan.
    #[serde(default)]
    pub include_human_feedback: bool,
    /// Where research material comes from.
    #[serde(default)]
    pub source: ReportSource,
    /// Report language.
    #[serde(default)]
    pub language: Language,
    /// Writing tone (e.g. "objective", "analytical").
    #[serde(default)]
    pub tone: Option<String>,
}

impl Task {
    /// Creates a task with defaults for everything except the query.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            model: None,
            max_sections: default_max_sections(),
            guidelines: Vec::new(),
            follow_guidelines: false,
            verbose: false,
            include_human_feedback: false,
            source: ReportSource::default(),
            language: Language::default(),
            tone: None,
        }
    }

    /// Loads a task from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] if the file cannot be read or
    /// parsed, or if the task fails [`Task::validate`].
    pub fn from_file(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AgentError::Orchestration {
            message: format!("failed to read task file {}: {e}", path.display()),
        })?;
        let task: Self = serde_json::from_str(&raw).map_err(|e| AgentError::Orchestration {
            message: format!("invalid task file {}: {e}", path.display()),
        })?;
        task.validate()?;
        Ok(task)
    }

    /// Checks the task invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for an empty or oversized query
    /// or a zero section budget.
    pub fn validate(&self) -> Result<(), AgentError> {
        const MAX_QUERY_LEN: usize = 10_000;

        if self.query.trim().is_empty() {
            return Err(AgentError::Orchestration {
                message: "Query cannot be empty".to_string(),
            });
        }
        if self.query.len() > MAX_QUERY_LEN {
            return Err(AgentError::Orchestration {
                message: format!(
                    "Query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                    self.query.len()
                ),
            });
        }
        if self.max_sections == 0 {
            return Err(AgentError::Orchestration {
                message: "max_sections must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Resolves the model, falling back to `default`.
    #[must_use]
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults_from_minimal_json() {
        let task: Task = serde_json::from_str(r#"{"query": "solid-state batteries"}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(task.max_sections, 3);
        assert!(task.guidelines.is_empty());
        assert!(!task.follow_guidelines);
        assert_eq!(task.source, ReportSource::Web);
        assert_eq!(task.language, Language::En);
    }

    #[test]
    fn test_task_full_json() {
        let json = r#"{
            "query": "AI in healthcare",
            "model": "gpt-4o",
            "max_sections": 5,
            "guidelines": ["Use APA citations", "Write in English"],
            "follow_guidelines": true,
            "verbose": true,
            "include_human_feedback": true,
            "source": "hybrid",
            "language": "zh",
            "tone": "analytical"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap_or_else(|_| unreachable!());
        assert_eq!(task.model.as_deref(), Some("gpt-4o"));
        assert_eq!(task.guidelines.len(), 2);
        assert_eq!(task.source, ReportSource::Hybrid);
        assert_eq!(task.language, Language::Zh);
    }

    #[test]
    fn test_validate_rejects_empty_query() {
        assert!(Task::new("   ").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sections() {
        let mut task = Task::new("q");
        task.max_sections = 0;
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_model_or() {
        let mut task = Task::new("q");
        assert_eq!(task.model_or("fallback"), "fallback");
        task.model = Some("gpt-4o".to_string());
        assert_eq!(task.model_or("fallback"), "gpt-4o");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("task.json");
        std::fs::write(&path, r#"{"query": "quantum error correction", "max_sections": 2}"#)
            .unwrap_or_else(|_| unreachable!());
        let task = Task::from_file(&path).unwrap_or_else(|_| unreachable!());
        assert_eq!(task.query, "quantum error correction");
        assert_eq!(task.max_sections, 2);
    }

    #[test]
    fn test_source_from_str() {
        assert_eq!("LOCAL".parse::<ReportSource>(), Ok(ReportSource::Local));
        assert!("ftp".parse::<ReportSource>().is_err());
    }
}
