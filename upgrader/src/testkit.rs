//! Scripted fakes for unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::channel::probe::ReachabilityProbe;
use crate::channel::CommandChannel;
use crate::errors::FleetError;

/// Command channel that replays canned responses and records the exchange
#[derive(Default)]
pub struct ScriptedChannel {
    responses: Mutex<HashMap<String, String>>,
    fail_commands: Mutex<HashSet<String>>,
    fail_save: AtomicBool,
    fail_transfer: AtomicBool,
    transcript: Mutex<Vec<String>>,
    configs: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned response for an exact command
    pub fn respond(&self, command: &str, output: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), output.to_string());
    }

    /// Make an exact command fail with a CommandFailure
    pub fn fail_on(&self, command: &str) {
        self.fail_commands
            .lock()
            .unwrap()
            .insert(command.to_string());
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_transfer(&self, fail: bool) {
        self.fail_transfer.store(fail, Ordering::SeqCst);
    }

    /// Every command sent, in order
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().unwrap().clone()
    }

    /// Every configuration command applied, in order
    pub fn configs(&self) -> Vec<String> {
        self.configs.lock().unwrap().clone()
    }

    fn exchange(&self, command: &str) -> Result<String, FleetError> {
        self.transcript.lock().unwrap().push(command.to_string());
        if self.fail_commands.lock().unwrap().contains(command) {
            return Err(FleetError::CommandFailure(format!(
                "scripted failure for '{}'",
                command
            )));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    async fn send_command(&self, command: &str) -> Result<String, FleetError> {
        self.exchange(command)
    }

    async fn send_command_expect(
        &self,
        command: &str,
        _expect: &str,
    ) -> Result<String, FleetError> {
        self.exchange(command)
    }

    async fn send_config(&self, commands: &[String]) -> Result<(), FleetError> {
        for command in commands {
            self.exchange(command)?;
            self.configs.lock().unwrap().push(command.clone());
        }
        Ok(())
    }

    async fn save_config(&self) -> Result<(), FleetError> {
        self.transcript.lock().unwrap().push("<save>".to_string());
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(FleetError::CommandFailure(
                "scripted save failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn transfer_file(&self, _source: &Path, dest: &str) -> Result<(), FleetError> {
        self.transcript
            .lock()
            .unwrap()
            .push(format!("<transfer {}>", dest));
        if self.fail_transfer.load(Ordering::SeqCst) {
            return Err(FleetError::TransferFailure(format!(
                "scripted transfer failure for {}",
                dest
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), FleetError> {
        self.transcript.lock().unwrap().push("<close>".to_string());
        Ok(())
    }
}

/// Probe that pops scripted outcomes, then repeats a default
pub struct ScriptedProbe {
    outcomes: Mutex<VecDeque<bool>>,
    default: bool,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    /// Replays `outcomes` in order, then answers `default` forever
    pub fn new(outcomes: Vec<bool>, default: bool) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            default,
            calls: AtomicUsize::new(0),
        }
    }

    /// Probe that fails `n` times and then succeeds
    pub fn down_for(n: usize) -> Self {
        Self::new(vec![false; n], true)
    }

    /// Probe that never succeeds
    pub fn always_down() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn probe(&self, _address: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default)
    }
}
