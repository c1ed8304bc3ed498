//! Target image transfer

use std::path::Path;

use tracing::info;

use crate::channel::CommandChannel;
use crate::device::Device;
use crate::errors::FleetError;

/// Copy the target image from the local artifact directory to the device,
/// keeping the same filename
pub async fn copy_primary_image(
    device: &mut Device,
    channel: &dyn CommandChannel,
    image_dir: &Path,
) -> Result<(), FleetError> {
    let source = image_dir.join(&device.primary_image);

    info!(
        "{}: transferring {} from {}",
        device.name,
        device.primary_image,
        source.display()
    );

    channel
        .transfer_file(&source, &device.primary_image)
        .await
        .map_err(|e| match e {
            e @ FleetError::TransferFailure(_) => e,
            other => FleetError::TransferFailure(other.to_string()),
        })
}
