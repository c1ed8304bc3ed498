//! Inventory loading

use std::collections::HashSet;
use std::path::Path;

use inventory_model::{DeviceRecord, InventoryDoc};
use tracing::info;

use crate::errors::FleetError;

/// Parse an inventory document, rejecting duplicate device names
pub fn parse_inventory(contents: &str) -> Result<Vec<DeviceRecord>, FleetError> {
    let doc: InventoryDoc = serde_json::from_str(contents)?;

    let mut seen = HashSet::new();
    for record in &doc.devices {
        if !seen.insert(record.name.as_str()) {
            return Err(FleetError::InventoryError(format!(
                "duplicate device name '{}'",
                record.name
            )));
        }
    }

    Ok(doc.devices)
}

/// Load the device inventory from a JSON file
pub async fn load_inventory(path: &Path) -> Result<Vec<DeviceRecord>, FleetError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        FleetError::InventoryError(format!("unable to read {}: {}", path.display(), e))
    })?;

    let records = parse_inventory(&contents)?;
    info!("{} devices in inventory {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inventory() {
        let records = parse_inventory(
            r#"{"devices": [
                {"name": "sw1", "primary_image": "isr-v2.bin"},
                {"name": "sw2", "address": "10.0.0.2", "primary_image": "isr-v2.bin"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address(), "sw1");
        assert_eq!(records[1].address(), "10.0.0.2");
    }

    #[test]
    fn test_parse_inventory_rejects_duplicates() {
        let err = parse_inventory(
            r#"{"devices": [
                {"name": "sw1", "primary_image": "a.bin"},
                {"name": "sw1", "primary_image": "b.bin"}
            ]}"#,
        );
        assert!(matches!(err, Err(FleetError::InventoryError(_))));
    }
}
