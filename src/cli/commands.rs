//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// netconf-automate - Verified NETCONF configuration changes with alerts.
#[derive(Parser, Debug)]
#[command(name = "netconf-automate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "NETCONF_AUTOMATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a configuration template and `.env.example`.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show the change set that `run` would apply.
    Plan {
        /// Include the read-back filter and edit payload.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Apply the change set, verify it and send a notification.
    Run {
        /// Target device address; prompts when omitted.
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Print the current configuration without changing it.
    Snapshot {
        /// Target device address; prompts when omitted.
        #[arg(short, long)]
        target: Option<String>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_with_target_and_json() {
        let cli = Cli::try_parse_from([
            "netconf-automate",
            "run",
            "--target",
            "10.0.0.5",
            "--output",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Run { target: Some(ref t) } if t == "10.0.0.5"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["netconf-automate", "init"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Init { ref path, force: false } if path == &PathBuf::from(".")));
    }

    #[test]
    fn test_snapshot_without_target() {
        let cli = Cli::try_parse_from(["netconf-automate", "-v", "snapshot"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Snapshot { target: None }));
    }
}
