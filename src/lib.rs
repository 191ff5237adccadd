//! # dossier-rs
//!
//! Multi-agent research report generator.
//!
//! A research query is turned into a structured report by a fixed crew of
//! model-backed agents: an initial research pass, an editor that plans the
//! sections, an optional human review of the plan, concurrent per-section
//! research with a review/revise cycle, and a writer that frames the
//! result with an introduction, conclusion and sources.
//!
//! ## Example
//!
//! ```no_run
//! use dossier_rs::agent::providers::create_provider;
//! use dossier_rs::agent::{Orchestrator, ReportConfig, Task};
//!
//! # async fn demo() -> Result<(), dossier_rs::error::AgentError> {
//! let config = ReportConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let outcome = Orchestrator::new(config, provider)
//!     .run(Task::new("Is AI in a hype cycle?"))
//!     .await?;
//! let markdown = outcome.report.to_markdown();
//! # let _ = markdown;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
#[cfg(feature = "server")]
pub mod server;

pub use core::Language;
pub use error::{AgentError, CommandError, Error, Result};
