//! Readiness verification
//!
//! Four independent probes, each appending one finding to the device's
//! results. A WARN never stops the remaining checks; judging the report is
//! left to whoever consumes it.

use tracing::{debug, warn};

use crate::channel::CommandChannel;
use crate::device::{Device, ResultRecord};
use crate::errors::FleetError;

/// Run all readiness checks against a device
pub async fn verify_device(
    device: &mut Device,
    channel: &dyn CommandChannel,
) -> Result<(), FleetError> {
    let primary = device.primary_image.clone();
    let running = device.running_image()?.to_string();

    // 1. Target image present in flash
    let output = channel
        .send_command(&format!("dir flash:/{}", primary))
        .await?;
    device.record_result(if output.contains(&primary) {
        ResultRecord::ok("primary image in flash")
    } else {
        ResultRecord::warn("primary image not in flash")
    });

    // 2. Fallback image present in flash
    let output = channel
        .send_command(&format!("dir flash:/{}", running))
        .await?;
    device.record_result(if output.contains(&running) {
        ResultRecord::ok("secondary image in flash")
    } else {
        ResultRecord::warn("secondary image not in flash")
    });

    // 3. Boot order
    let output = channel
        .send_command("show run | include boot system")
        .await?;
    let record = classify_boot_order(&output, &primary);
    device.record_result(record);

    // 4. Persist configuration; a failed save is a finding, not an error
    let record = match channel.save_config().await {
        Ok(()) => ResultRecord::ok("ready for reboot"),
        Err(e) => {
            warn!("{}: config save failed: {}", device.name, e);
            ResultRecord::warn("not ready for reboot")
        }
    };
    device.record_result(record);

    debug!(
        "{}: verification finished with {} findings",
        device.name,
        device.script_results().len()
    );
    Ok(())
}

/// Classify the configured boot order from the device's own rendering of it
///
/// Total over every line count: two entries mean an upgrade is staged (the
/// first must reference the target), one entry means the device already
/// runs the target, anything else is a misconfiguration.
pub fn classify_boot_order(output: &str, primary_image: &str) -> ResultRecord {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [first, _] => {
            if first.contains(primary_image) {
                ResultRecord::ok("boot order correct")
            } else {
                ResultRecord::warn("boot order incorrect")
            }
        }
        [only] => {
            if only.contains(primary_image) {
                ResultRecord::ok("already on target version, no upgrade needed")
            } else {
                ResultRecord::warn("boot order incorrect")
            }
        }
        _ => ResultRecord::warn("unexpected number of boot entries"),
    }
}
