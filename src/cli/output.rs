//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{AutomationConfig, ValidationResult};
use crate::device::{ConfigChangeSet, TargetDevice};
use crate::outcome::FailureCategory;
use crate::snapshot::ConfigSnapshot;
use crate::workflow::{NotificationStatus, WorkflowReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Change set row for table display.
#[derive(Tabled)]
struct EditRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Change")]
    change: String,
}

/// JSON view of a change set.
#[derive(Serialize)]
struct PlanJson<'a> {
    summary: String,
    expected_marker: &'a str,
    change_set: &'a ConfigChangeSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
}

/// JSON view of a snapshot.
#[derive(Serialize)]
struct SnapshotJson<'a> {
    target: &'a TargetDevice,
    snapshot: &'a ConfigSnapshot,
}

/// JSON view of a validation result.
#[derive(Serialize)]
struct ValidationJson<'a> {
    valid: bool,
    errors: Vec<ValidationErrorJson<'a>>,
    warnings: &'a [String],
    config: &'a AutomationConfig,
}

#[derive(Serialize)]
struct ValidationErrorJson<'a> {
    field: &'a str,
    message: &'a str,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a change set for display.
    #[must_use]
    pub fn format_plan(&self, change_set: &ConfigChangeSet, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let filter = change_set.filter();
                let json = PlanJson {
                    summary: change_set.summary(),
                    expected_marker: change_set.expected_marker(),
                    change_set,
                    filter: detailed.then_some(filter.as_str()),
                    payload: detailed.then(|| change_set.to_payload()),
                };
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(change_set, detailed),
        }
    }

    fn format_plan_text(change_set: &ConfigChangeSet, detailed: bool) -> String {
        let mut output = String::from("\nChange set\n\n");

        let mut rows: Vec<EditRow> = change_set
            .interfaces()
            .iter()
            .enumerate()
            .map(|(i, edit)| EditRow {
                index: i + 1,
                target: edit.label(),
                change: format!("description -> {}", edit.description),
            })
            .collect();

        if let Some(hostname) = change_set.hostname() {
            rows.push(EditRow {
                index: rows.len() + 1,
                target: String::from("hostname"),
                change: format!("-> {hostname}"),
            });
        }

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nPlan: {} edits, verified by marker '{}'\n",
            change_set.edit_count().to_string().green(),
            change_set.expected_marker()
        );

        if detailed {
            let _ = write!(output, "\nRead-back filter:\n{}\n", change_set.filter().as_str());
            let _ = write!(output, "\nEdit payload:\n{}\n", change_set.to_payload());
        }

        output
    }

    /// Formats a workflow report.
    #[must_use]
    pub fn format_report(&self, report: &WorkflowReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    fn format_report_text(report: &WorkflowReport) -> String {
        let mut output = String::new();

        if let Some(before) = &report.before {
            let _ = write!(output, "\n--- Config BEFORE change ---\n{}\n", before.rendered());
        }
        if let Some(after) = &report.after {
            let _ = write!(output, "\n--- Config AFTER change ---\n{}\n", after.rendered());
        }

        let headline = if report.outcome.is_success() {
            format!("{} SUCCESS: configuration verified", "✓".green())
        } else {
            let label = match report.outcome.category() {
                FailureCategory::None => String::from("verification failed"),
                category => format!("{category} failure"),
            };
            format!("{} FAILURE: {label}", "✗".red())
        };
        let _ = write!(output, "\n{headline}\n\n");

        let _ = writeln!(output, "   Run:       {}", report.run_id);
        let _ = writeln!(output, "   Device:    {}", report.target.endpoint());
        let _ = writeln!(output, "   From:      {}", report.initiated_from);
        if !report.outcome.detail().is_empty() {
            let _ = writeln!(output, "   Detail:    {}", report.outcome.detail());
        }
        if let Some(applied) = report.applied {
            let _ = writeln!(output, "   Edit ok:   {}", applied.ok);
        }
        if let Some(changed) = report.config_changed() {
            let _ = writeln!(output, "   Changed:   {changed}");
        }

        let elapsed = report.finished_at - report.started_at;
        let _ = writeln!(output, "   Duration:  {}ms", elapsed.num_milliseconds());

        let stages: Vec<String> = report.stages.iter().map(ToString::to_string).collect();
        let _ = writeln!(output, "   Stages:    {}", stages.join(" -> "));

        match &report.notification {
            NotificationStatus::Delivered => {
                let _ = writeln!(output, "   Notified:  {}", "yes".green());
            }
            NotificationStatus::Failed { error } => {
                let _ = writeln!(output, "   Notified:  {} ({error})", "no".yellow());
            }
        }

        output
    }

    /// Formats a read-only snapshot.
    #[must_use]
    pub fn format_snapshot(&self, target: &TargetDevice, snapshot: &ConfigSnapshot) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&SnapshotJson { target, snapshot }).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!(
                    "\n--- Config on {} ({}) ---\n{}\n",
                    target.endpoint(),
                    snapshot.captured_at().format("%Y-%m-%d %H:%M:%S UTC"),
                    snapshot.rendered()
                );
                if !snapshot.is_available() {
                    let _ = write!(output, "\nDevice data could not be formatted:\n{}\n", snapshot.raw());
                }
                let _ = writeln!(output, "\nDigest: {}", &snapshot.digest()[..12]);
                output
            }
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(
        &self,
        result: &ValidationResult,
        config: &AutomationConfig,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = ValidationJson {
                    valid: result.is_valid(),
                    errors: result
                        .errors
                        .iter()
                        .map(|e| ValidationErrorJson {
                            field: &e.field,
                            message: &e.message,
                        })
                        .collect(),
                    warnings: &result.warnings,
                    config,
                };
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_validation_text(result, config, show_warnings),
        }
    }

    fn format_validation_text(
        result: &ValidationResult,
        config: &AutomationConfig,
        show_warnings: bool,
    ) -> String {
        let mut output = String::new();

        if result.is_valid() {
            let _ = writeln!(output, "{} Configuration is valid!", "✓".green());
        } else {
            let _ = writeln!(output, "{} Configuration is invalid:", "✗".red());
            for error in &result.errors {
                let _ = writeln!(output, "   - {}: {}", error.field, error.message);
            }
        }

        if show_warnings && !result.warnings.is_empty() {
            let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
            for warning in &result.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        output.push_str("\nConfiguration summary:\n");
        let _ = writeln!(
            output,
            "   Default device: {}:{}",
            config.device.default_address, config.device.port
        );
        let _ = writeln!(output, "   Vendor profile: {}", config.device.vendor_profile);
        let _ = writeln!(
            output,
            "   Timeouts:       connect {}s, rpc {}s",
            config.device.connect_timeout_secs, config.device.rpc_timeout_secs
        );
        let _ = writeln!(output, "   Notifier:       {:?}", config.notifier.backend);

        output
    }
}
