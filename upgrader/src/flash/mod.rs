//! Flash image inventory and cleanup
//!
//! Walks a device's flash listing, works out which image is running, plans
//! which images are obsolete and purges them. Only `primary_image` and the
//! running image ever survive a cleanup.

use tracing::{debug, info, warn};

use crate::channel::CommandChannel;
use crate::device::{Device, ResultRecord};
use crate::errors::FleetError;

/// Filename extension identifying firmware images in a flash listing
const FIRMWARE_EXT: &str = ".bin";

/// List flash storage and record every firmware image found
pub async fn list_flash_images(
    device: &mut Device,
    channel: &dyn CommandChannel,
) -> Result<(), FleetError> {
    let output = channel.send_command("dir flash:").await?;

    device.images_in_flash = output
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .filter(|name| name.ends_with(FIRMWARE_EXT))
        .map(|name| name.to_string())
        .collect();

    debug!(
        "{}: {} firmware images in flash",
        device.name,
        device.images_in_flash.len()
    );
    Ok(())
}

/// Identify the image the device is currently running
///
/// The version report names the image with its storage prefix
/// (`flash:/isr-v1.bin`); only the bare filename is kept.
pub async fn identify_running_image(
    device: &mut Device,
    channel: &dyn CommandChannel,
) -> Result<(), FleetError> {
    let output = channel.send_command("show version").await?;

    let line = output
        .lines()
        .find(|line| line.contains("System image file is"))
        .ok_or_else(|| {
            FleetError::ParseFailure(format!(
                "{}: version report does not name a system image",
                device.name
            ))
        })?;

    let raw = line
        .split('"')
        .nth(1)
        .unwrap_or_else(|| line.split_whitespace().last().unwrap_or(""));

    let filename = canonical_image_name(raw);
    if filename.is_empty() {
        return Err(FleetError::ParseFailure(format!(
            "{}: could not parse running image from '{}'",
            device.name,
            line.trim()
        )));
    }

    debug!("{}: running image is {}", device.name, filename);
    device.running_image = Some(filename);
    Ok(())
}

/// Strip storage prefixes and path separators from an image reference
fn canonical_image_name(raw: &str) -> String {
    raw.rsplit(['/', ':'])
        .find(|part| !part.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Plan which images to purge: everything in flash that is neither the
/// target nor the running image
pub fn plan_removal(device: &mut Device) -> Result<(), FleetError> {
    let running = device.running_image()?.to_string();

    device.images_to_remove = device
        .images_in_flash
        .iter()
        .filter(|image| **image != device.primary_image && **image != running)
        .cloned()
        .collect();

    info!(
        "{}: {} images scheduled for removal",
        device.name,
        device.images_to_remove.len()
    );
    Ok(())
}

/// Purge the planned images from flash
///
/// Each deletion is a three-exchange protocol: the delete request, the
/// filename confirmation, and the final confirm. Deletions are independent
/// and fire-and-forget: a failed one is recorded and the loop moves on.
pub async fn remove_images(
    device: &mut Device,
    channel: &dyn CommandChannel,
) -> Result<(), FleetError> {
    let images = device.images_to_remove.clone();

    for image in images {
        match delete_image(&image, channel).await {
            Ok(()) => {
                info!("{}: removed {}", device.name, image);
                device.record_result(ResultRecord::ok(format!("removed {}", image)));
            }
            Err(e) => {
                warn!("{}: could not remove {}: {}", device.name, image, e);
                device.record_result(ResultRecord::warn(format!(
                    "could not remove {}: {}",
                    image, e
                )));
            }
        }
    }

    Ok(())
}

async fn delete_image(image: &str, channel: &dyn CommandChannel) -> Result<(), FleetError> {
    channel
        .send_command_expect(&format!("delete flash:/{}", image), "Delete filename")
        .await?;
    channel.send_command_expect("", "[confirm]").await?;
    channel.send_command("").await?;
    Ok(())
}
