//! Command channel abstraction
//!
//! The upgrade workflow never owns a transport. It drives devices through
//! the narrow [`CommandChannel`] interface; login, privilege escalation and
//! prompt handling are the implementor's concern.

pub mod exec;
pub mod probe;

use std::path::Path;

use async_trait::async_trait;

use crate::errors::FleetError;

/// A command-execution session with one device
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Send a command and return the device's output
    async fn send_command(&self, command: &str) -> Result<String, FleetError>;

    /// Send a command and wait for output containing `expect`
    async fn send_command_expect(&self, command: &str, expect: &str)
        -> Result<String, FleetError>;

    /// Enter configuration mode and apply `commands` in order
    async fn send_config(&self, commands: &[String]) -> Result<(), FleetError>;

    /// Persist the running configuration. Idempotent.
    async fn save_config(&self) -> Result<(), FleetError>;

    /// Transfer a local file to the device's storage under `dest`
    async fn transfer_file(&self, source: &Path, dest: &str) -> Result<(), FleetError>;

    /// Release the session. A device rebooting underneath the channel is
    /// expected; implementors must tolerate an already-dead transport.
    async fn close(&self) -> Result<(), FleetError>;
}
