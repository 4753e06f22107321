//! Declarative change sets and the filters that read them back.
//!
//! A change set targets the IOS-XE native YANG model. It renders the
//! `edit-config` payload, a subtree filter selecting exactly the edited
//! nodes, and a one-line human summary for notifications.

use std::fmt::Write;

use quick_xml::escape::escape;
use serde::Serialize;

/// Namespace of the IOS-XE native model.
pub const IOS_XE_NATIVE_NS: &str = "http://cisco.com/ns/yang/Cisco-IOS-XE-native";

/// Interface families addressable by the change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterfaceKind {
    /// 1G Ethernet.
    GigabitEthernet,
    /// 10G Ethernet.
    TenGigabitEthernet,
    /// Loopback.
    Loopback,
}

impl InterfaceKind {
    /// YANG list name for this family.
    #[must_use]
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::GigabitEthernet => "GigabitEthernet",
            Self::TenGigabitEthernet => "TenGigabitEthernet",
            Self::Loopback => "Loopback",
        }
    }

    /// CLI abbreviation (`Gi`, `Te`, `Lo`).
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::GigabitEthernet => "Gi",
            Self::TenGigabitEthernet => "Te",
            Self::Loopback => "Lo",
        }
    }
}

/// A single interface description edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceDescription {
    /// Interface family.
    pub kind: InterfaceKind,
    /// Interface number, e.g. `1/0/1`.
    pub name: String,
    /// New description.
    pub description: String,
}

impl InterfaceDescription {
    /// Abbreviated interface label, e.g. `Gi1/0/1`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}{}", self.kind.short_name(), self.name)
    }
}

/// Subtree filter selecting the nodes touched by a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescriptor(String);

impl FilterDescriptor {
    /// Wraps a pre-built filter document.
    #[must_use]
    pub fn new(xml: impl Into<String>) -> Self {
        Self(xml.into())
    }

    /// The filter document.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An ordered, immutable set of configuration edits plus the marker that
/// proves they landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigChangeSet {
    interfaces: Vec<InterfaceDescription>,
    hostname: Option<String>,
    expected_marker: String,
}

impl ConfigChangeSet {
    /// Creates an empty change set verified by `expected_marker`.
    #[must_use]
    pub fn new(expected_marker: impl Into<String>) -> Self {
        Self {
            interfaces: Vec::new(),
            hostname: None,
            expected_marker: expected_marker.into(),
        }
    }

    /// Appends an interface description edit.
    #[must_use]
    pub fn with_interface_description(
        mut self,
        kind: InterfaceKind,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.interfaces.push(InterfaceDescription {
            kind,
            name: name.into(),
            description: description.into(),
        });
        self
    }

    /// Sets the new hostname.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// The L1 service-upgrade change set applied by `run`.
    #[must_use]
    pub fn standard() -> Self {
        Self::new("R1-NIM-UPDATED")
            .with_interface_description(
                InterfaceKind::GigabitEthernet,
                "1/0/1",
                "CUSTOMER_X_SERVICE_UPGRADE_10G",
            )
            .with_interface_description(
                InterfaceKind::GigabitEthernet,
                "1/0/2",
                "CIRCUIT_ID_L1-AUTOMATION-12345",
            )
            .with_hostname("R1-NIM-UPDATED")
    }

    /// Interface edits in application order.
    #[must_use]
    pub fn interfaces(&self) -> &[InterfaceDescription] {
        &self.interfaces
    }

    /// Hostname edit, if any.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Marker expected in the post-change snapshot.
    #[must_use]
    pub fn expected_marker(&self) -> &str {
        &self.expected_marker
    }

    /// Total number of edits.
    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.interfaces.len() + usize::from(self.hostname.is_some())
    }

    /// Renders the `<config>` payload for `edit-config`.
    #[must_use]
    pub fn to_payload(&self) -> String {
        let mut xml = String::from("<config>\n");
        let _ = writeln!(xml, "  <native xmlns=\"{IOS_XE_NATIVE_NS}\">");

        if !self.interfaces.is_empty() {
            xml.push_str("    <interface>\n");
            for edit in &self.interfaces {
                let element = edit.kind.element_name();
                let _ = writeln!(xml, "      <{element}>");
                let _ = writeln!(xml, "        <name>{}</name>", escape(edit.name.as_str()));
                let _ = writeln!(
                    xml,
                    "        <description>{}</description>",
                    escape(edit.description.as_str())
                );
                let _ = writeln!(xml, "      </{element}>");
            }
            xml.push_str("    </interface>\n");
        }

        if let Some(hostname) = &self.hostname {
            let _ = writeln!(xml, "    <hostname>{}</hostname>", escape(hostname.as_str()));
        }

        xml.push_str("  </native>\n</config>");
        xml
    }

    /// Renders the subtree filter that reads back every edited node.
    #[must_use]
    pub fn filter(&self) -> FilterDescriptor {
        let mut xml = String::from("<filter type=\"subtree\">\n");
        let _ = writeln!(xml, "  <native xmlns=\"{IOS_XE_NATIVE_NS}\">");

        if !self.interfaces.is_empty() {
            xml.push_str("    <interface>\n");
            for edit in &self.interfaces {
                let element = edit.kind.element_name();
                let _ = writeln!(
                    xml,
                    "      <{element}>\n        <name>{}</name>\n      </{element}>",
                    escape(edit.name.as_str())
                );
            }
            xml.push_str("    </interface>\n");
        }

        if self.hostname.is_some() {
            xml.push_str("    <hostname/>\n");
        }

        xml.push_str("  </native>\n</filter>");
        FilterDescriptor(xml)
    }

    /// One-sentence summary, e.g.
    /// "Descriptions set on Gi1/0/1 and Gi1/0/2, and hostname changed."
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.interfaces.is_empty() {
            let labels: Vec<String> = self.interfaces.iter().map(InterfaceDescription::label).collect();
            parts.push(format!("Descriptions set on {}", join_with_and(&labels)));
        }

        if self.hostname.is_some() {
            parts.push(String::from("hostname changed"));
        }

        if parts.is_empty() {
            return String::from("No changes.");
        }

        let mut sentence = parts.join(", and ");
        sentence.push('.');
        sentence
    }
}

/// Joins items as "a", "a and b", or "a, b and c".
fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {last}", head.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_payload_contains_every_edit() {
        let payload = ConfigChangeSet::standard().to_payload();

        assert!(payload.starts_with("<config>"));
        assert!(payload.contains(IOS_XE_NATIVE_NS));
        assert!(payload.contains("<name>1/0/1</name>"));
        assert!(payload.contains("<description>CUSTOMER_X_SERVICE_UPGRADE_10G</description>"));
        assert!(payload.contains("<description>CIRCUIT_ID_L1-AUTOMATION-12345</description>"));
        assert!(payload.contains("<hostname>R1-NIM-UPDATED</hostname>"));
        assert!(payload.ends_with("</config>"));
    }

    #[test]
    fn test_filter_selects_interfaces_and_hostname() {
        let filter = ConfigChangeSet::standard().filter();
        let xml = filter.as_str();

        assert!(xml.starts_with("<filter type=\"subtree\">"));
        assert_eq!(xml.matches("<GigabitEthernet>").count(), 2);
        assert!(xml.contains("<hostname/>"));
        assert!(!xml.contains("<description>"));
    }

    #[test]
    fn test_values_are_escaped() {
        let change_set = ConfigChangeSet::new("x").with_interface_description(
            InterfaceKind::Loopback,
            "0",
            "A&B <core>",
        );
        let payload = change_set.to_payload();

        assert!(payload.contains("<description>A&amp;B &lt;core&gt;</description>"));
        assert!(!payload.contains("<hostname>"));
    }

    #[test]
    fn test_summary_matches_standard_wording() {
        assert_eq!(
            ConfigChangeSet::standard().summary(),
            "Descriptions set on Gi1/0/1 and Gi1/0/2, and hostname changed."
        );
    }

    #[test]
    fn test_summary_variants() {
        let hostname_only = ConfigChangeSet::new("R2").with_hostname("R2");
        assert_eq!(hostname_only.summary(), "hostname changed.");

        let three = ConfigChangeSet::new("m")
            .with_interface_description(InterfaceKind::GigabitEthernet, "1/0/1", "a")
            .with_interface_description(InterfaceKind::TenGigabitEthernet, "1/1/1", "b")
            .with_interface_description(InterfaceKind::Loopback, "0", "c");
        assert_eq!(three.summary(), "Descriptions set on Gi1/0/1, Te1/1/1 and Lo0.");
        assert_eq!(three.edit_count(), 3);

        assert_eq!(ConfigChangeSet::new("m").summary(), "No changes.");
    }

    #[test]
    fn test_standard_marker_is_new_hostname() {
        let change_set = ConfigChangeSet::standard();
        assert_eq!(change_set.expected_marker(), "R1-NIM-UPDATED");
        assert_eq!(change_set.hostname(), Some("R1-NIM-UPDATED"));
        assert_eq!(change_set.edit_count(), 3);
    }
}
