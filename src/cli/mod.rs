//! CLI module for the automation tool.
//!
//! This module provides the command-line interface for running and
//! inspecting configuration changes.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
