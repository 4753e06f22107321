// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![cfg_attr(not(test), deny(missing_docs))] // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # netconf-automate
//!
//! Verified configuration changes on network devices over NETCONF, with a
//! chat notification for every run.
//!
//! ## Overview
//!
//! A run resolves the target device, connects over NETCONF/SSH, captures the
//! relevant configuration, applies a declarative change set, captures the
//! configuration again and checks it for a marker. The outcome is classified
//! and posted to a Webex room.
//!
//! ## Architecture
//!
//! 1. **Input**: the target address, prompted or passed with `--target`
//! 2. **Device**: session traits plus a NETCONF adapter over any byte stream
//! 3. **Workflow**: the single forward path with error containment
//! 4. **Outcome**: SUCCESS or FAILURE with a failure category
//! 5. **Notify**: Webex or log delivery
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`input`]: Target address resolution
//! - [`device`]: Device sessions, change sets and the NETCONF adapter
//! - [`snapshot`]: Snapshot formatting and marker verification
//! - [`outcome`]: Outcome classification and notification payloads
//! - [`notify`]: Notification backends
//! - [`workflow`]: The workflow orchestrator
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! device:
//!   default_address: 192.168.1.10
//!   port: 830
//!   vendor_profile: iosxe
//! notifier:
//!   backend: webex
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod input;
pub mod notify;
pub mod outcome;
pub mod snapshot;
pub mod workflow;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{AutomationConfig, ConfigParser, ConfigValidator};
pub use device::{ConfigChangeSet, DeviceConnector, DeviceSession, TargetDevice};
pub use error::{AutomationError, Result};
pub use notify::{LogNotifier, Notifier, WebexNotifier};
pub use outcome::{FailureCategory, NotificationPayload, OutcomeStatus, WorkflowOutcome};
pub use snapshot::{ConfigSnapshot, SnapshotFormatter};
pub use workflow::{WorkflowOrchestrator, WorkflowReport};
