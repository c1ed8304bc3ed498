//! Subprocess-backed command channel
//!
//! Runs one remote-exec process per exchange (`ssh` in batch mode by
//! default, `scp` for transfers). Good enough for devices that accept
//! non-interactive exec; anything needing a full expect-style login
//! session should bring its own [`CommandChannel`] implementation.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::channel::CommandChannel;
use crate::errors::FleetError;

/// Command templates for the exec channel
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Remote-exec argv; `{address}` is substituted, the device command is
    /// appended as the final argument
    pub command_template: Vec<String>,

    /// File-transfer argv; `{address}`, `{source}` and `{dest}` are
    /// substituted
    pub transfer_template: Vec<String>,

    /// Command that persists the running configuration
    pub save_command: String,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            command_template: vec![
                "ssh".to_string(),
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                "{address}".to_string(),
            ],
            transfer_template: vec![
                "scp".to_string(),
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                "{source}".to_string(),
                "{address}:{dest}".to_string(),
            ],
            save_command: "write memory".to_string(),
        }
    }
}

/// Command channel that shells out for every exchange
pub struct ExecChannel {
    address: String,
    options: ExecOptions,
}

impl ExecChannel {
    pub fn new(address: impl Into<String>, options: ExecOptions) -> Self {
        Self {
            address: address.into(),
            options,
        }
    }

    fn substitute(&self, arg: &str, source: Option<&str>, dest: Option<&str>) -> String {
        let mut out = arg.replace("{address}", &self.address);
        if let Some(source) = source {
            out = out.replace("{source}", source);
        }
        if let Some(dest) = dest {
            out = out.replace("{dest}", dest);
        }
        out
    }

    async fn run_remote(&self, command: &str) -> Result<String, FleetError> {
        let mut argv: Vec<String> = self
            .options
            .command_template
            .iter()
            .map(|arg| self.substitute(arg, None, None))
            .collect();
        argv.push(command.to_string());

        debug!("{}: exec {:?}", self.address, argv);

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .await
            .map_err(|e| {
                FleetError::CommandFailure(format!("{}: failed to spawn {}: {}", self.address, argv[0], e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FleetError::CommandFailure(format!(
                "{}: '{}' exited with {} ({})",
                self.address,
                command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl CommandChannel for ExecChannel {
    async fn send_command(&self, command: &str) -> Result<String, FleetError> {
        self.run_remote(command).await
    }

    async fn send_command_expect(
        &self,
        command: &str,
        expect: &str,
    ) -> Result<String, FleetError> {
        let output = self.run_remote(command).await?;
        if !output.contains(expect) {
            return Err(FleetError::CommandFailure(format!(
                "{}: '{}' did not produce expected prompt '{}'",
                self.address, command, expect
            )));
        }
        Ok(output)
    }

    async fn send_config(&self, commands: &[String]) -> Result<(), FleetError> {
        for command in commands {
            self.run_remote(command).await?;
        }
        Ok(())
    }

    async fn save_config(&self) -> Result<(), FleetError> {
        self.run_remote(&self.options.save_command).await.map(|_| ())
    }

    async fn transfer_file(&self, source: &Path, dest: &str) -> Result<(), FleetError> {
        let source = source.to_string_lossy();
        let argv: Vec<String> = self
            .options
            .transfer_template
            .iter()
            .map(|arg| self.substitute(arg, Some(&source), Some(dest)))
            .collect();

        debug!("{}: transfer {:?}", self.address, argv);

        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .await
            .map_err(|e| {
                FleetError::TransferFailure(format!("{}: failed to spawn {}: {}", self.address, argv[0], e))
            })?;

        if !status.success() {
            error!("{}: transfer of {} failed", self.address, dest);
            return Err(FleetError::TransferFailure(format!(
                "{}: transfer of {} exited with {}",
                self.address, dest, status
            )));
        }

        Ok(())
    }

    async fn close(&self) -> Result<(), FleetError> {
        // One process per exchange; nothing is held open between calls.
        Ok(())
    }
}
