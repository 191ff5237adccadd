//! Human feedback on the research plan.
//!
//! The agent shows the planned sections to a person through a
//! [`FeedbackSource`] and returns their reply, if any. A plain "no" (or
//! "没有") means no feedback. Channel failures and timeouts are logged and
//! treated as no feedback, so the run always continues.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncWriteExt, stderr};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use super::catalog::{Catalog, Message};
use super::state::ResearchState;
use crate::error::AgentError;

/// Replies that decline to give feedback.
static DECLINE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:no|nope|没有|不)\s*[.!。！]?\s*$"));

/// Lines from a single stdin reader thread.
///
/// The thread is detached: a runtime shutting down while a request is
/// pending never waits on the blocking read. EOF or a read error closes
/// the channel.
static STDIN_LINES: LazyLock<Mutex<mpsc::UnboundedReceiver<String>>> = LazyLock::new(|| {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("dossier-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            loop {
                let mut line = String::new();
                match stdin.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to start stdin reader");
    }
    Mutex::new(rx)
});

/// Where human replies come from.
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    /// Shows `prompt` and waits for one reply. The source is responsible
    /// for displaying the prompt.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Feedback`] if the channel fails or the reply
    /// is malformed.
    async fn request(&self, prompt: &str) -> Result<String, AgentError>;
}

/// Reads replies from the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleFeedback;

#[async_trait]
impl FeedbackSource for ConsoleFeedback {
    async fn request(&self, prompt: &str) -> Result<String, AgentError> {
        let mut err = stderr();
        err.write_all(prompt.as_bytes())
            .await
            .map_err(|e| AgentError::Feedback {
                message: format!("failed to show prompt: {e}"),
            })?;
        err.flush().await.map_err(|e| AgentError::Feedback {
            message: format!("failed to show prompt: {e}"),
        })?;

        let mut lines = STDIN_LINES.lock().await;
        // Lines typed after an earlier request timed out are stale.
        while let Ok(stale) = lines.try_recv() {
            debug!(stale = stale.trim_end(), "discarding stale console input");
        }
        lines.recv().await.ok_or_else(|| AgentError::Feedback {
            message: "stdin closed".to_string(),
        })
    }
}

/// Source for runs without a human: every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

#[async_trait]
impl FeedbackSource for NoFeedback {
    async fn request(&self, _prompt: &str) -> Result<String, AgentError> {
        Err(AgentError::Feedback {
            message: "no feedback channel configured".to_string(),
        })
    }
}

/// Maps a raw reply to feedback: blank replies and refusals become `None`.
#[must_use]
pub fn normalize_feedback(reply: &str) -> Option<String> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return None;
    }
    let declined = DECLINE
        .as_ref()
        .map_or_else(|_| trimmed.eq_ignore_ascii_case("no"), |re| re.is_match(trimmed));
    if declined {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Asks a person to review the section plan.
#[derive(Clone)]
pub struct HumanAgent {
    source: Arc<dyn FeedbackSource>,
    catalog: Catalog,
    timeout: Duration,
}

impl HumanAgent {
    /// Creates an agent reading from `source`, waiting at most `timeout`.
    #[must_use]
    pub fn new(source: Arc<dyn FeedbackSource>, catalog: Catalog, timeout: Duration) -> Self {
        Self {
            source,
            catalog,
            timeout,
        }
    }

    /// Returns the human's feedback on the plan, or `None`.
    ///
    /// Returns `None` immediately when the task does not ask for feedback.
    pub async fn review_plan(&self, state: &ResearchState) -> Option<String> {
        if !state.task.include_human_feedback {
            return None;
        }

        let prompt = self.catalog.render(&Message::HumanFeedbackRequest {
            layout: &state.sections,
        });
        let reply = match tokio::time::timeout(self.timeout, self.source.request(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, "error receiving human feedback");
                return None;
            }
            Err(_) => {
                warn!(after = ?self.timeout, "no human feedback before timeout");
                return None;
            }
        };

        let feedback = normalize_feedback(&reply);
        info!(has_feedback = feedback.is_some(), "human feedback received");
        feedback
    }
}

impl std::fmt::Debug for HumanAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HumanAgent")
            .field("catalog", &self.catalog)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
