//! Device access module.
//!
//! This module handles everything between the workflow and a managed device:
//! - The session capability traits the workflow depends on
//! - Declarative change sets and their read-back filters
//! - The NETCONF protocol adapter
//! - The SSH transport (behind the `ssh` feature)

mod change_set;
mod session;
pub mod netconf;
#[cfg(feature = "ssh")]
mod ssh;

pub use change_set::{
    ConfigChangeSet, FilterDescriptor, IOS_XE_NATIVE_NS, InterfaceDescription, InterfaceKind,
};
pub use session::{ApplyResult, Credentials, DeviceConnector, DeviceSession, TargetDevice};
#[cfg(feature = "ssh")]
pub use ssh::SshConnector;
#[cfg(test)]
pub(crate) use session::{MockDeviceConnector, MockDeviceSession};
