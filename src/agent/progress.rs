//! Progress reporting.
//!
//! Agents describe what they are doing through a [`ProgressSink`]. The CLI
//! uses [`ConsoleSink`], which forwards to `tracing`; the websocket server
//! installs a sink that serializes events to the connected client.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Coarse class of a progress event, mirrored on the wire as `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Informational stage update.
    Logs,
    /// A request for human input.
    HumanFeedback,
    /// The finished report.
    Report,
}

/// One progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Event class.
    pub category: EventCategory,
    /// Machine-readable event name (e.g. `"depth_research"`).
    pub event_type: &'static str,
    /// Rendered, localized message.
    pub message: String,
    /// Emitting agent label (e.g. `"RESEARCHER"`).
    pub agent: &'static str,
}

impl ProgressEvent {
    /// Builds a [`EventCategory::Logs`] event.
    #[must_use]
    pub fn log(agent: &'static str, event_type: &'static str, message: String) -> Self {
        Self {
            category: EventCategory::Logs,
            event_type,
            message,
            agent,
        }
    }

    /// Wire form sent to websocket clients.
    #[must_use]
    pub fn to_wire(&self) -> WireEvent<'_> {
        WireEvent {
            kind: self.category,
            content: self.event_type,
            output: &self.message,
        }
    }
}

/// JSON shape of an event on the websocket: `{"type", "content", "output"}`.
#[derive(Debug, Serialize)]
pub struct WireEvent<'a> {
    /// Event category.
    #[serde(rename = "type")]
    pub kind: EventCategory,
    /// Event name.
    pub content: &'a str,
    /// Message text.
    pub output: &'a str,
}

/// Consumer of progress events.
///
/// `emit` must not block; sinks that do I/O hand the event off to a task.
pub trait ProgressSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: ProgressEvent);
}

/// Sink that writes events to the `tracing` log, labelled by agent.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: ProgressEvent) {
        info!(agent = event.agent, event = event.event_type, "{}", event.message);
    }
}

/// Sink that forwards events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            debug!("progress receiver dropped, event discarded");
        }
    }
}
