//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use fwfleet::channel::probe::ReachabilityProbe;
use fwfleet::channel::CommandChannel;
use fwfleet::device::Device;
use fwfleet::errors::FleetError;
use fwfleet::fleet::StepContext;
use fwfleet::reboot::MonitorOptions;
use inventory_model::DeviceRecord;

/// Command channel replaying canned responses
#[derive(Default)]
pub struct FakeChannel {
    responses: Mutex<HashMap<String, String>>,
    fail_commands: Mutex<HashSet<String>>,
    fail_save: AtomicBool,
    fail_transfer: AtomicBool,
    transcript: Mutex<Vec<String>>,
    configs: Mutex<Vec<String>>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, command: &str, output: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), output.to_string());
    }

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

    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().unwrap().clone()
    }

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
impl CommandChannel for FakeChannel {
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

/// Probe replaying scripted outcomes, then a default
pub struct FakeProbe {
    outcomes: Mutex<VecDeque<bool>>,
    default: bool,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn down_for(n: usize) -> Self {
        Self {
            outcomes: Mutex::new(vec![false; n].into()),
            default: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_down() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn probe(&self, _address: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default)
    }
}

/// Fresh device state named `name` targeting `primary_image`
pub fn device(name: &str, primary_image: &str) -> Device {
    let record: DeviceRecord = serde_json::from_str(&format!(
        r#"{{"name": "{}", "primary_image": "{}"}}"#,
        name, primary_image
    ))
    .unwrap();
    Device::new(&record)
}

/// Step context wired to the given fakes
pub fn context(channel: Arc<FakeChannel>, probe: Arc<FakeProbe>) -> StepContext {
    StepContext {
        channel,
        probe,
        image_dir: PathBuf::from("images"),
        monitor: MonitorOptions::default(),
    }
}
