//! Inventory models

use serde::{Deserialize, Serialize};

/// A device entry from the fleet inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device name, used in reports and as the default address
    pub name: String,

    /// Management address; falls back to the name when omitted
    #[serde(default)]
    pub address: Option<String>,

    /// Target firmware image filename for this device
    pub primary_image: String,
}

impl DeviceRecord {
    /// Address to reach the device at
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.name)
    }
}

/// Top-level inventory document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryDoc {
    pub devices: Vec<DeviceRecord>,
}
