//! Presentation layer for ausweis-bridge
//!
//! This crate contains the CLI definition and console formatting of SDK
//! replies.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat, SdkCommand};
pub use output::console::ConsoleFormatter;
