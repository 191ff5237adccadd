//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dossier: multi-agent research report generator.
///
/// Plans a report outline from an initial research pass, researches each
/// section in parallel through a review/revise cycle, and writes a
/// localized report.
#[derive(Parser, Debug)]
#[command(name = "dossier")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a query and write a report.
    ///
    /// Requires an OpenAI-compatible API key in `OPENAI_API_KEY` or
    /// `DOSSIER_API_KEY`.
    #[command(after_help = r#"Examples:
  dossier run "Is AI in a hype cycle?"
  dossier run "固态电池的前景" --language zh --max-sections 5
  dossier run "EV battery recycling" --guideline "Use APA citations" --follow-guidelines
  dossier run "Quantum networking" --human-feedback --publish md --publish json
  dossier run --task-file task.json --output-dir ./reports
  dossier --format json run "LLM evaluation methods" | jq '.usage'
"#)]
    Run(RunArgs),

    /// Write the default prompt templates for customization.
    ///
    /// Existing files are never overwritten.
    #[command(name = "init-prompts")]
    InitPrompts {
        /// Target directory (defaults to `~/.config/dossier/prompts`).
        dir: Option<PathBuf>,
    },

    /// Serve interactive runs over a websocket at `/ws`.
    #[cfg(feature = "server")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind.
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Directory containing prompt template files.
        #[arg(long, env = "DOSSIER_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,
    },
}

/// Arguments for [`Commands::Run`].
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Research query. Required unless `--task-file` is given.
    #[arg(required_unless_present = "task_file")]
    pub query: Option<String>,

    /// Load the task from a JSON file; other task flags override it.
    #[arg(long)]
    pub task_file: Option<PathBuf>,

    /// Model for every agent.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum planned sections.
    #[arg(long)]
    pub max_sections: Option<usize>,

    /// Report guideline (repeatable).
    #[arg(short, long = "guideline")]
    pub guidelines: Vec<String>,

    /// Review drafts against the guidelines.
    #[arg(long)]
    pub follow_guidelines: bool,

    /// Ask for feedback on the plan before researching.
    #[arg(long)]
    pub human_feedback: bool,

    /// Emit extra progress detail (reviews, layouts).
    #[arg(long)]
    pub detailed: bool,

    /// Report language: en, zh.
    #[arg(short, long)]
    pub language: Option<String>,

    /// Research source: web, local, hybrid.
    #[arg(long)]
    pub source: Option<String>,

    /// Writing tone, e.g. "analytical".
    #[arg(long)]
    pub tone: Option<String>,

    /// Directory published reports are written to.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Document format to publish: md, json (repeatable; defaults to md).
    #[arg(long = "publish")]
    pub publish: Vec<String>,

    /// Revision rounds per section.
    #[arg(long)]
    pub max_revisions: Option<u32>,

    /// Sections researched concurrently.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Deadline for one section, in seconds.
    #[arg(long)]
    pub section_timeout: Option<u64>,

    /// Directory containing prompt template files.
    #[arg(long)]
    pub prompt_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "dossier",
            "--format",
            "json",
            "run",
            "EV batteries",
            "-g",
            "Use APA",
            "-g",
            "Be brief",
            "--follow-guidelines",
            "--language",
            "zh",
            "--publish",
            "json",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.format, "json");
        let Commands::Run(args) = cli.command else {
            unreachable!()
        };
        assert_eq!(args.query.as_deref(), Some("EV batteries"));
        assert_eq!(args.guidelines, vec!["Use APA", "Be brief"]);
        assert!(args.follow_guidelines);
        assert_eq!(args.language.as_deref(), Some("zh"));
        assert_eq!(args.publish, vec!["json"]);
    }

    #[test]
    fn test_run_requires_query_or_task_file() {
        assert!(Cli::try_parse_from(["dossier", "run"]).is_err());
        assert!(Cli::try_parse_from(["dossier", "run", "--task-file", "t.json"]).is_ok());
    }

    #[test]
    fn test_init_prompts_optional_dir() {
        let cli = Cli::try_parse_from(["dossier", "init-prompts", "/tmp/p"])
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            cli.command,
            Commands::InitPrompts { dir: Some(ref d) } if d == &PathBuf::from("/tmp/p")
        ));
    }
}
