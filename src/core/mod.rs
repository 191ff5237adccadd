//! Core types shared by the CLI and the agent pipeline.

pub mod language;

pub use language::Language;
