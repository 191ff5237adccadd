//! CLI layer for dossier.
//!
//! Provides the command-line interface using clap, with commands for
//! running reports, writing prompt templates and serving websocket runs.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, RunArgs};
