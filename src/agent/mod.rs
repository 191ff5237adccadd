//! Multi-agent research report pipeline.
//!
//! Turns a query into a structured report by chaining model calls through
//! a fixed set of agents. Uses a pluggable provider abstraction backed by
//! OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! Task → Orchestrator
//!   ├── ResearchAgent (initial broad research)
//!   ├── EditorAgent (plans sections)
//!   │   └── HumanAgent (optional plan review, re-plan on feedback)
//!   ├── Fan-out → N concurrent ReviewCycles
//!   │   └── depth research → ReviewerAgent ⇄ ReviserAgent
//!   ├── Fan-in in plan order
//!   └── WriterAgent → FinalReport → Publisher
//! ```
//!
//! Progress goes to a [`ProgressSink`]; every message shown to users comes
//! from the localized [`Catalog`].

pub mod catalog;
pub mod config;
pub mod editor;
pub mod human;
pub mod message;
pub mod orchestrator;
pub mod progress;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod publisher;
pub mod researcher;
pub mod reviewer;
pub mod reviser;
pub mod state;
pub mod task;
#[cfg(test)]
mod testing;
pub mod traits;
pub mod workflow;
pub mod writer;

// Re-export key types
pub use catalog::{Catalog, Message};
pub use config::ReportConfig;
pub use editor::EditorAgent;
pub use human::{ConsoleFeedback, FeedbackSource, HumanAgent, NoFeedback};
pub use message::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat, Role, TokenUsage};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use progress::{ChannelSink, ConsoleSink, EventCategory, ProgressEvent, ProgressSink};
pub use prompt::PromptSet;
pub use provider::{LlmProvider, UsageTotals};
pub use publisher::{DocumentFormat, FinalReport, Publisher};
pub use researcher::{LlmResearcher, ResearchAgent, ResearchRequest, Researcher};
pub use reviewer::ReviewerAgent;
pub use reviser::ReviserAgent;
pub use state::{DraftState, Headers, ReportLayout, ResearchState, SectionDraft, Verdict};
pub use task::{ReportSource, Task};
pub use traits::{Agent, execute_structured};
pub use workflow::ReviewCycle;
pub use writer::WriterAgent;
