//! Per-device upgrade state
//!
//! Each [`Device`] is owned exclusively by the workflow instance driving it;
//! it is never shared across devices.

use std::collections::BTreeSet;

use inventory_model::DeviceRecord;
use serde::{Deserialize, Serialize};

use crate::reboot::fsm::RebootFsm;

/// Severity of a verification finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warn,
}

/// An ordered, severity-tagged finding produced during the upgrade run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub message: String,
    pub severity: Severity,
}

impl ResultRecord {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Ok,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warn,
        }
    }
}

/// Mutable per-device attribute store for one upgrade run
#[derive(Debug, Clone)]
pub struct Device {
    /// Device name from the inventory
    pub name: String,

    /// Management address
    pub address: String,

    /// Target firmware image filename
    pub primary_image: String,

    /// Firmware images found in flash storage
    pub images_in_flash: BTreeSet<String>,

    /// Image currently executing on the device, once identified
    pub running_image: Option<String>,

    /// Images scheduled for deletion, in planning order
    pub images_to_remove: Vec<String>,

    /// Maintenance-pass state machine
    pub reboot: RebootFsm,

    /// Findings accumulated during the run, in check order
    script_results: Vec<ResultRecord>,

    /// Set by the first failing step; never cleared within a run
    failed: bool,

    /// Description of the failure that stopped this device, if any
    failure: Option<String>,
}

impl Device {
    /// Create a fresh device state from an inventory record
    pub fn new(record: &DeviceRecord) -> Self {
        Self {
            name: record.name.clone(),
            address: record.address().to_string(),
            primary_image: record.primary_image.clone(),
            images_in_flash: BTreeSet::new(),
            running_image: None,
            images_to_remove: Vec::new(),
            reboot: RebootFsm::new(),
            script_results: Vec::new(),
            failed: false,
            failure: None,
        }
    }

    /// Running image, or an error message when a step needs it before
    /// [`identify_running_image`](crate::flash::identify_running_image) ran
    pub fn running_image(&self) -> Result<&str, crate::errors::FleetError> {
        self.running_image.as_deref().ok_or_else(|| {
            crate::errors::FleetError::StateError(format!(
                "{}: running image not yet identified",
                self.name
            ))
        })
    }

    /// Append a finding. Results are append-only: nothing reorders or
    /// removes them during a run.
    pub fn record_result(&mut self, record: ResultRecord) {
        self.script_results.push(record);
    }

    /// Findings recorded so far, in the order the checks ran
    pub fn script_results(&self) -> &[ResultRecord] {
        &self.script_results
    }

    /// Mark this device as failed. The flag is monotonic: once set it
    /// stays set for the rest of the run, and only the first reason is kept.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        if !self.failed {
            self.failed = true;
            self.failure = Some(reason.into());
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}
