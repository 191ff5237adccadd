//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Async work runs on a
//! runtime created per command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agent::providers::create_provider;
use crate::agent::config::{ReportConfig, ReportConfigBuilder};
use crate::agent::human::ConsoleFeedback;
use crate::agent::progress::ConsoleSink;
use crate::agent::prompt::PromptSet;
use crate::agent::publisher::{DocumentFormat, Publisher};
use crate::agent::task::{ReportSource, Task};
use crate::agent::{Catalog, Orchestrator};
use crate::cli::output::{OutputFormat, format_outcome};
use crate::cli::parser::{Cli, Commands, RunArgs};
use crate::core::Language;
use crate::error::{CommandError, Result};

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Run(args) => cmd_run(args, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        #[cfg(feature = "server")]
        Commands::Serve {
            host,
            port,
            prompt_dir,
        } => cmd_serve(host, *port, prompt_dir.as_deref()),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Cancels `token` on Ctrl-C. Must be called inside a runtime.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            token.cancel();
        }
    });
}

/// Builds the task from `--task-file` and the individual flags.
///
/// Flags override values from the task file.
pub(crate) fn build_task(args: &RunArgs) -> Result<Task> {
    let mut task = match &args.task_file {
        Some(path) => Task::from_file(path)?,
        None => Task::new(args.query.as_deref().unwrap_or_default()),
    };

    if let Some(query) = &args.query {
        task.query.clone_from(query);
    }
    if let Some(model) = &args.model {
        task.model = Some(model.clone());
    }
    if let Some(n) = args.max_sections {
        task.max_sections = n;
    }
    if !args.guidelines.is_empty() {
        task.guidelines.clone_from(&args.guidelines);
    }
    task.follow_guidelines |= args.follow_guidelines;
    task.include_human_feedback |= args.human_feedback;
    task.verbose |= args.detailed;
    if let Some(language) = &args.language {
        task.language = Language::parse(language).ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "unknown language '{language}' (expected en or zh)"
            ))
        })?;
    }
    if let Some(source) = &args.source {
        task.source = source
            .parse::<ReportSource>()
            .map_err(CommandError::InvalidArgument)?;
    }
    if let Some(tone) = &args.tone {
        task.tone = Some(tone.clone());
    }

    task.validate()?;
    Ok(task)
}

/// Parses `--publish` values, defaulting to markdown.
pub(crate) fn parse_formats(values: &[String]) -> Result<Vec<DocumentFormat>> {
    if values.is_empty() {
        return Ok(vec![DocumentFormat::Markdown]);
    }
    let mut formats = Vec::with_capacity(values.len());
    for value in values {
        let format: DocumentFormat = value.parse().map_err(CommandError::InvalidArgument)?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

/// Applies `run` flags that map onto [`ReportConfig`].
fn config_builder(args: &RunArgs) -> ReportConfigBuilder {
    let mut builder = ReportConfig::builder();
    if let Some(n) = args.max_revisions {
        builder = builder.max_revisions(n);
    }
    if let Some(n) = args.concurrency {
        builder = builder.max_concurrency(n);
    }
    if let Some(secs) = args.section_timeout {
        builder = builder.section_timeout(Duration::from_secs(secs));
    }
    if let Some(dir) = &args.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir);
    }
    builder.from_env()
}

fn cmd_run(args: &RunArgs, format: OutputFormat) -> Result<String> {
    let task = build_task(args)?;
    let formats = parse_formats(&args.publish)?;

    let config = config_builder(args).build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Report configuration error: {e}"))
    })?;
    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let output_dir = config.output_dir.clone();
    let wants_feedback = task.include_human_feedback;

    let rt = runtime()?;
    let (outcome, published) = rt.block_on(async {
        let cancel = CancellationToken::new();
        cancel_on_interrupt(cancel.clone());

        let sink = Arc::new(ConsoleSink);
        let mut orchestrator = Orchestrator::new(config, provider)
            .with_sink(sink.clone())
            .with_cancellation(cancel);
        if wants_feedback {
            orchestrator = orchestrator.with_feedback(Arc::new(ConsoleFeedback));
        }

        let outcome = orchestrator.run(task).await?;
        let publisher = Publisher::new(sink, Catalog::new(outcome.report.language));
        let published = publisher
            .publish(&outcome.report, &output_dir, &formats)
            .await?;
        Ok::<_, crate::error::AgentError>((outcome, published))
    })?;

    Ok(format_outcome(&outcome, &published, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

/// Serves websocket runs until interrupted.
#[cfg(feature = "server")]
fn cmd_serve(host: &str, port: u16, prompt_dir: Option<&Path>) -> Result<String> {
    let mut builder = ReportConfig::builder();
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder.from_env().build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Report configuration error: {e}"))
    })?;
    let addr = format!("{host}:{port}");

    let rt = runtime()?;
    rt.block_on(async {
        let shutdown = CancellationToken::new();
        cancel_on_interrupt(shutdown.clone());
        crate::server::serve(&addr, config, shutdown).await
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("Server error: {e:#}")))?;

    Ok("Server stopped.\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(query: &str) -> RunArgs {
        RunArgs {
            query: Some(query.to_string()),
            ..RunArgs::default()
        }
    }

    #[test]
    fn test_build_task_from_flags() {
        let mut run = args("EV batteries");
        run.guidelines = vec!["Use APA".to_string()];
        run.follow_guidelines = true;
        run.language = Some("zh".to_string());
        run.source = Some("hybrid".to_string());
        run.max_sections = Some(5);
        let task = build_task(&run).unwrap_or_else(|_| unreachable!());
        assert_eq!(task.query, "EV batteries");
        assert_eq!(task.guidelines, vec!["Use APA"]);
        assert!(task.follow_guidelines);
        assert_eq!(task.language, Language::Zh);
        assert_eq!(task.source, ReportSource::Hybrid);
        assert_eq!(task.max_sections, 5);
    }

    #[test]
    fn test_build_task_rejects_unknown_language() {
        let mut run = args("q");
        run.language = Some("fr".to_string());
        assert!(build_task(&run).is_err());
    }

    #[test]
    fn test_build_task_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("task.json");
        std::fs::write(
            &path,
            r#"{"query": "from file", "guidelines": ["A"], "follow_guidelines": true}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        let run = RunArgs {
            task_file: Some(path),
            max_sections: Some(2),
            ..RunArgs::default()
        };
        let task = build_task(&run).unwrap_or_else(|_| unreachable!());
        assert_eq!(task.query, "from file");
        assert_eq!(task.guidelines, vec!["A"]);
        assert!(task.follow_guidelines);
        assert_eq!(task.max_sections, 2);
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(
            parse_formats(&[]).unwrap_or_default(),
            vec![DocumentFormat::Markdown]
        );
        let both = parse_formats(&["json".to_string(), "md".to_string(), "json".to_string()])
            .unwrap_or_default();
        assert_eq!(both, vec![DocumentFormat::Json, DocumentFormat::Markdown]);
        assert!(parse_formats(&["pdf".to_string()]).is_err());
    }

    #[test]
    fn test_init_prompts_writes_then_skips() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let first = cmd_init_prompts(Some(dir.path()), OutputFormat::Text).unwrap_or_default();
        assert!(first.starts_with("Wrote "));
        assert!(first.contains("editor.md"));
        let second = cmd_init_prompts(Some(dir.path()), OutputFormat::Json).unwrap_or_default();
        let json: serde_json::Value = serde_json::from_str(&second).unwrap_or_default();
        assert_eq!(json["count"], 0);
    }
}
