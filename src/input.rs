//! Target address resolution.
//!
//! The target device address comes from an [`InputSource`] (stdin in the
//! binary, scripted lines in tests). A blank answer selects the configured
//! default, which is trusted and returned without validation.

use std::io::{BufRead, Write};
use std::net::IpAddr;

use tracing::{debug, info};

use crate::error::InputError;

/// A line-oriented source of user answers.
pub trait InputSource {
    /// Shows `prompt` and reads one line.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;

    /// Shows a message to the user between prompts.
    fn notice(&mut self, message: &str);
}

/// Interactive source backed by stdin, prompting on stderr.
#[derive(Debug, Default)]
pub struct StdinSource;

impl InputSource for StdinSource {
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        eprint!("{prompt}");
        std::io::stderr().flush()?;

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// Resolves a single answer against the default address.
///
/// Blank input yields `default` unchanged. Anything else must be an IPv4 or
/// IPv6 literal and is returned exactly as typed (after trimming).
///
/// # Errors
///
/// Returns [`InputError::InvalidFormat`] if the input is not an IP literal.
pub fn resolve_address(raw: &str, default: &str) -> Result<String, InputError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Ok(default.to_string());
    }

    if is_ip_literal(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(InputError::InvalidFormat {
            input: trimmed.to_string(),
        })
    }
}

/// Prompts until a valid IP literal or a blank line is entered.
///
/// # Errors
///
/// Returns [`InputError::Closed`] if the source ends first, or
/// [`InputError::ReadFailed`] if reading fails.
pub fn prompt_for_address<S: InputSource + ?Sized>(
    source: &mut S,
    default: &str,
) -> Result<String, InputError> {
    let prompt = format!("Please enter the Target Router IP (default: {default}): ");
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let line = source
            .read_line(&prompt)
            .map_err(|e| InputError::ReadFailed {
                message: e.to_string(),
            })?
            .ok_or(InputError::Closed)?;

        match resolve_address(&line, default) {
            Ok(address) => {
                if line.trim().is_empty() {
                    source.notice(&format!("Using default IP: {default}"));
                    info!("No target entered, using default {default}");
                }
                debug!("Target resolved after {attempts} attempt(s)");
                return Ok(address);
            }
            Err(e) => {
                debug!("Rejected target input: {e}");
                source.notice("Invalid IP address format. Please try again.");
            }
        }
    }
}

/// Returns true if `s` parses as an IPv4 or IPv6 address literal.
#[must_use]
pub fn is_ip_literal(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays fixed answers and records notices.
    struct ScriptedSource {
        lines: VecDeque<String>,
        prompts: usize,
        notices: Vec<String>,
    }

    impl ScriptedSource {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| format!("{l}\n")).collect(),
                prompts: 0,
                notices: Vec::new(),
            }
        }
    }

    impl InputSource for ScriptedSource {
        fn read_line(&mut self, _prompt: &str) -> std::io::Result<Option<String>> {
            self.prompts += 1;
            Ok(self.lines.pop_front())
        }

        fn notice(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    #[test]
    fn test_valid_literals_returned_unchanged() {
        for ip in ["10.0.0.5", "192.168.1.10", "::1", "2001:db8::8a2e:370:7334", "fe80::1"] {
            assert_eq!(resolve_address(ip, "192.168.1.10").unwrap(), ip);
        }
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        for bad in ["10.0.0", "300.1.1.1", "router1", "10.0.0.5:830", "[::1]", "1.2.3.4.5"] {
            let result = resolve_address(bad, "192.168.1.10");
            assert!(
                matches!(result, Err(InputError::InvalidFormat { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_default_is_trusted_without_validation() {
        assert_eq!(resolve_address("", "core-sw1.lab").unwrap(), "core-sw1.lab");
    }

    #[test]
    fn test_blank_input_uses_default_without_retry() {
        let mut source = ScriptedSource::new(&[""]);
        let address = prompt_for_address(&mut source, "192.168.1.10").unwrap();

        assert_eq!(address, "192.168.1.10");
        assert_eq!(source.prompts, 1);
        assert_eq!(source.notices, vec!["Using default IP: 192.168.1.10"]);
    }

    #[test]
    fn test_reprompts_until_valid() {
        let mut source = ScriptedSource::new(&["not-an-ip", "10.0.0", " 10.0.0.5 "]);
        let address = prompt_for_address(&mut source, "192.168.1.10").unwrap();

        assert_eq!(address, "10.0.0.5");
        assert_eq!(source.prompts, 3);
        assert_eq!(source.notices.len(), 2);
    }

    #[test]
    fn test_end_of_input_is_closed() {
        let mut source = ScriptedSource::new(&["bogus"]);
        let result = prompt_for_address(&mut source, "192.168.1.10");
        assert!(matches!(result, Err(InputError::Closed)));
    }
}
