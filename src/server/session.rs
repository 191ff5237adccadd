//! One websocket client's run.
//!
//! The socket carries JSON in both directions. Outbound frames are queued
//! as strings on an unbounded channel drained by the connection's writer
//! task; inbound human feedback is routed to the [`SocketFeedback`] of the
//! active run.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agent::providers::create_provider;
use crate::agent::config::ReportConfig;
use crate::agent::human::FeedbackSource;
use crate::agent::progress::{ChannelSink, EventCategory, ProgressEvent};
use crate::agent::task::Task;
use crate::agent::Orchestrator;
use crate::error::AgentError;

/// Frames a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts a run.
    Start {
        /// Task to run.
        task: Task,
    },
    /// Reply to a plan review request.
    HumanFeedback {
        /// Free-text feedback; "no" declines.
        #[serde(default)]
        content: String,
    },
}

/// Serializes one outbound event in the `{"type", "content", "output"}` shape.
pub(crate) fn wire_json(event: &ProgressEvent) -> String {
    serde_json::to_string(&event.to_wire()).unwrap_or_else(|e| {
        format!(r#"{{"type":"logs","content":"error","output":"serialization failed: {e}"}}"#)
    })
}

/// Feedback source fed by inbound socket frames.
pub struct SocketFeedback {
    outbound: mpsc::UnboundedSender<String>,
    replies: Mutex<mpsc::UnboundedReceiver<Result<String, AgentError>>>,
}

impl SocketFeedback {
    /// Creates a source writing requests to `outbound` and the sender the
    /// connection uses to deliver replies.
    #[must_use]
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
    ) -> (Self, mpsc::UnboundedSender<Result<String, AgentError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound,
                replies: Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl FeedbackSource for SocketFeedback {
    async fn request(&self, prompt: &str) -> Result<String, AgentError> {
        let mut replies = self.replies.lock().await;
        // Replies sent before this request are stale.
        while let Ok(stale) = replies.try_recv() {
            debug!(?stale, "discarding unsolicited feedback frame");
        }

        let event = ProgressEvent {
            category: EventCategory::HumanFeedback,
            event_type: "request",
            message: prompt.to_string(),
            agent: "HUMAN",
        };
        self.outbound
            .send(wire_json(&event))
            .map_err(|_| AgentError::Feedback {
                message: "socket closed".to_string(),
            })?;

        replies.recv().await.unwrap_or_else(|| {
            Err(AgentError::Feedback {
                message: "socket closed before feedback arrived".to_string(),
            })
        })
    }
}

impl std::fmt::Debug for SocketFeedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketFeedback").finish_non_exhaustive()
    }
}

/// Runs `task` and streams its progress, then the report, to `outbound`.
pub async fn run_session(
    task: Task,
    config: ReportConfig,
    outbound: mpsc::UnboundedSender<String>,
    feedback: Arc<SocketFeedback>,
    cancel: CancellationToken,
) {
    let provider = match create_provider(&config) {
        Ok(provider) => provider,
        Err(e) => {
            error!(error = %e, "provider creation failed");
            let _ = outbound.send(wire_json(&ProgressEvent::log("SERVER", "error", e.to_string())));
            return;
        }
    };

    let (sink, mut events) = ChannelSink::new();
    let forward = outbound.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if forward.send(wire_json(&event)).is_err() {
                break;
            }
        }
    });

    let orchestrator = Orchestrator::new(config, provider)
        .with_sink(Arc::new(sink))
        .with_feedback(feedback)
        .with_cancellation(cancel);
    let result = orchestrator.run(task).await;
    // Closes the event channel so the forwarder drains and exits.
    drop(orchestrator);
    let _ = forwarder.await;

    let last = match result {
        Ok(outcome) => {
            info!(tokens = outcome.usage.total_tokens, "socket run complete");
            ProgressEvent {
                category: EventCategory::Report,
                event_type: "final_report",
                message: outcome.report.to_markdown(),
                agent: "PUBLISHER",
            }
        }
        Err(e) => {
            warn!(error = %e, "socket run failed");
            ProgressEvent::log("SERVER", "error", e.to_string())
        }
    };
    let _ = outbound.send(wire_json(&last));
}
