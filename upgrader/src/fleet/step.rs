//! Pipeline step descriptors
//!
//! A pipeline is an explicit ordered list of named steps applied uniformly
//! to every device. Steps mutate only their own device and reach the
//! outside world through the per-device [`StepContext`].

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::channel::probe::ReachabilityProbe;
use crate::channel::CommandChannel;
use crate::device::Device;
use crate::errors::FleetError;
use crate::reboot::MonitorOptions;
use crate::{deploy, flash, reboot, verify};

/// Per-device collaborators handed to every step
pub struct StepContext {
    /// Command session with this device
    pub channel: Arc<dyn CommandChannel>,

    /// Out-of-band liveness probe
    pub probe: Arc<dyn ReachabilityProbe>,

    /// Local directory holding firmware artifacts
    pub image_dir: PathBuf,

    /// Recovery monitor tuning
    pub monitor: MonitorOptions,
}

/// Boxed step body: borrows the device and its context for one invocation
pub type StepFn = Arc<
    dyn for<'a> Fn(&'a mut Device, &'a StepContext) -> BoxFuture<'a, Result<(), FleetError>>
        + Send
        + Sync,
>;

type StepPredicate = Arc<dyn Fn(&Device) -> bool + Send + Sync>;

/// A named unit of work in the pipeline
pub struct Step {
    name: &'static str,
    requires_session: bool,
    enabled: Option<StepPredicate>,
    run: StepFn,
}

impl Step {
    pub fn new(name: &'static str, run: StepFn) -> Self {
        Self {
            name,
            requires_session: true,
            enabled: None,
            run,
        }
    }

    /// Mark this step as not occupying a command session. The executor
    /// will not count it against the session concurrency bound.
    pub fn without_session(mut self) -> Self {
        self.requires_session = false;
        self
    }

    /// Restrict this step to devices matching `predicate`
    pub fn when(mut self, predicate: impl Fn(&Device) -> bool + Send + Sync + 'static) -> Self {
        self.enabled = Some(Arc::new(predicate));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn requires_session(&self) -> bool {
        self.requires_session
    }

    pub fn is_enabled(&self, device: &Device) -> bool {
        self.enabled.as_ref().map_or(true, |enabled| enabled(device))
    }

    pub async fn execute(
        &self,
        device: &mut Device,
        ctx: &StepContext,
    ) -> Result<(), FleetError> {
        (self.run)(device, ctx).await
    }
}

/// An ordered list of steps applied uniformly to all devices
pub struct Pipeline {
    name: &'static str,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: &'static str, steps: Vec<Step>) -> Self {
        Self { name, steps }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// The upgrade preparation pass: inventory, cleanup, deployment and
/// verification. Leaves the device ready to reload but does not touch it.
pub fn prepare_pipeline() -> Pipeline {
    Pipeline::new(
        "prepare",
        vec![
            Step::new(
                "list flash images",
                Arc::new(|device, ctx| {
                    Box::pin(async move {
                        flash::list_flash_images(device, ctx.channel.as_ref()).await
                    })
                }),
            ),
            Step::new(
                "identify running image",
                Arc::new(|device, ctx| {
                    Box::pin(async move {
                        flash::identify_running_image(device, ctx.channel.as_ref()).await
                    })
                }),
            ),
            Step::new(
                "plan image removal",
                Arc::new(|device, _ctx| {
                    Box::pin(async move { flash::plan_removal(device) })
                }),
            )
            .without_session(),
            Step::new(
                "remove old images",
                Arc::new(|device, ctx| {
                    Box::pin(
                        async move { flash::remove_images(device, ctx.channel.as_ref()).await },
                    )
                }),
            ),
            Step::new(
                "copy primary image",
                Arc::new(|device, ctx| {
                    Box::pin(async move {
                        deploy::copy_primary_image(device, ctx.channel.as_ref(), &ctx.image_dir)
                            .await
                    })
                }),
            )
            // No transfer needed when the target already sits in flash
            .when(|device| !device.images_in_flash.contains(&device.primary_image)),
            Step::new(
                "set boot order",
                Arc::new(|device, ctx| {
                    Box::pin(async move { deploy::set_boot_order(device, ctx.channel.as_ref()).await })
                }),
            ),
            Step::new(
                "verify readiness",
                Arc::new(|device, ctx| {
                    Box::pin(async move { verify::verify_device(device, ctx.channel.as_ref()).await })
                }),
            ),
        ],
    )
}

/// The maintenance pass: persist, reload, watch for recovery
pub fn maintenance_pipeline() -> Pipeline {
    Pipeline::new(
        "maintenance",
        vec![
            Step::new(
                "commit config",
                Arc::new(|device, ctx| {
                    Box::pin(async move { reboot::commit_config(device, ctx.channel.as_ref()).await })
                }),
            ),
            Step::new(
                "reboot device",
                Arc::new(|device, ctx| {
                    Box::pin(async move { reboot::issue_reboot(device, ctx.channel.as_ref()).await })
                }),
            ),
            // The long poll must not hold a session slot; other devices
            // keep making progress while this one is down.
            Step::new(
                "await recovery",
                Arc::new(|device, ctx| {
                    Box::pin(async move {
                        reboot::await_recovery(
                            device,
                            ctx.probe.as_ref(),
                            &ctx.monitor,
                            tokio::time::sleep,
                        )
                        .await
                        .map(|_| ())
                    })
                }),
            )
            .without_session(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_model::DeviceRecord;

    fn device() -> Device {
        let record: DeviceRecord = serde_json::from_str(
            r#"{"name": "sw1", "primary_image": "isr-v2.bin"}"#,
        )
        .unwrap();
        Device::new(&record)
    }

    #[test]
    fn test_prepare_pipeline_order() {
        let pipeline = prepare_pipeline();
        let names: Vec<_> = pipeline.steps().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "list flash images",
                "identify running image",
                "plan image removal",
                "remove old images",
                "copy primary image",
                "set boot order",
                "verify readiness",
            ]
        );
    }

    #[test]
    fn test_copy_step_skipped_when_image_already_in_flash() {
        let pipeline = prepare_pipeline();
        let copy = &pipeline.steps()[4];
        assert_eq!(copy.name(), "copy primary image");

        let mut device = device();
        assert!(copy.is_enabled(&device));

        device.images_in_flash.insert("isr-v2.bin".to_string());
        assert!(!copy.is_enabled(&device));
    }

    #[test]
    fn test_monitor_step_does_not_hold_session() {
        let pipeline = maintenance_pipeline();
        let monitor = pipeline.steps().last().unwrap();
        assert_eq!(monitor.name(), "await recovery");
        assert!(!monitor.requires_session());
    }
}
