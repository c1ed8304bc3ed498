//! Boot order configuration
//!
//! The target image always boots first. The currently running image stays
//! configured as the fallback entry unless it is the target itself, so a
//! bad image never strands the device without a bootable alternative.

use tracing::info;

use crate::channel::CommandChannel;
use crate::device::Device;
use crate::errors::FleetError;

/// Ordered boot entries for a device: `[primary]` when the device already
/// runs the target, `[primary, running]` otherwise
pub fn boot_plan(primary: &str, running: &str) -> Vec<String> {
    if primary == running {
        vec![primary.to_string()]
    } else {
        vec![primary.to_string(), running.to_string()]
    }
}

/// Clear the existing boot order and write the new one, then persist
pub async fn set_boot_order(
    device: &mut Device,
    channel: &dyn CommandChannel,
) -> Result<(), FleetError> {
    let running = device.running_image()?.to_string();
    let plan = boot_plan(&device.primary_image, &running);

    let mut commands = vec!["default boot system".to_string()];
    commands.extend(
        plan.iter()
            .map(|image| format!("boot system flash:/{}", image)),
    );

    info!("{}: boot order {:?}", device.name, plan);
    channel.send_config(&commands).await?;

    // Separate save step; repeating it later is harmless
    channel.save_config().await
}
