//! Reboot and reachability recovery
//!
//! The reload deliberately severs the command channel, so recovery is
//! watched through an out-of-band liveness probe instead. The polling loop
//! is the only long-blocking operation in the whole workflow; its sleep is
//! injected so the fleet executor can park it on the runtime and tests can
//! run it without waiting.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use crate::channel::probe::ReachabilityProbe;
use crate::channel::CommandChannel;
use crate::device::{Device, ResultRecord};
use crate::errors::FleetError;
use crate::reboot::fsm::RebootEvent;

/// Recovery monitor options
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Delay between liveness probes
    pub interval: Duration,

    /// Total time allowed for the device to come back
    pub budget: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            budget: Duration::from_secs(1200), // 20 minutes
        }
    }
}

/// Outcome of a successful recovery watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    /// Observed downtime, budget granularity
    pub downtime: Duration,
}

/// Persist the configuration. Always runs immediately before the reload.
pub async fn commit_config(
    device: &mut Device,
    channel: &dyn CommandChannel,
) -> Result<(), FleetError> {
    info!("{}: saving configuration before reload", device.name);
    channel.save_config().await?;
    device
        .reboot
        .process(RebootEvent::CommitConfig)
        .map_err(FleetError::StateError)
}

/// Send the reload command and release the session
pub async fn issue_reboot(
    device: &mut Device,
    channel: &dyn CommandChannel,
) -> Result<(), FleetError> {
    info!("{}: reloading", device.name);
    channel.send_command_expect("reload", "[confirm]").await?;

    // The acknowledgment triggers the reload; the session may already be
    // dead when the response would arrive, so its failure is tolerated.
    if let Err(e) = channel.send_command("").await {
        debug!("{}: reload acknowledgment dropped: {}", device.name, e);
    }
    let _ = channel.close().await;

    device
        .reboot
        .process(RebootEvent::IssueReboot)
        .map_err(FleetError::StateError)
}

/// Poll the device until it answers a probe or the budget runs out
///
/// Each iteration spends one probe; on failure the budget shrinks by one
/// interval before the sleep. Exhaustion is terminal for the device and is
/// never retried.
pub async fn await_recovery<P, S, F>(
    device: &mut Device,
    probe: &P,
    options: &MonitorOptions,
    sleep_fn: S,
) -> Result<Recovery, FleetError>
where
    P: ReachabilityProbe + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!(
        "{}: waiting up to {} seconds for the device to come back",
        device.name,
        options.budget.as_secs()
    );

    let mut remaining = options.budget;
    loop {
        if probe.probe(&device.address).await {
            device
                .reboot
                .process(RebootEvent::Recovered)
                .map_err(FleetError::StateError)?;

            let downtime = options.budget - remaining;
            info!(
                "{}: responding again after about {} seconds down",
                device.name,
                downtime.as_secs()
            );
            device.record_result(ResultRecord::ok(format!(
                "responding again after about {} seconds down",
                downtime.as_secs()
            )));
            return Ok(Recovery { downtime });
        }

        remaining = remaining.saturating_sub(options.interval);
        if remaining.is_zero() {
            device
                .reboot
                .process(RebootEvent::BudgetExhausted)
                .map_err(FleetError::StateError)?;

            return Err(FleetError::TimeoutFailure(format!(
                "{} did not answer a probe within {} seconds",
                device.name,
                options.budget.as_secs()
            )));
        }

        debug!(
            "{}: still down, {} seconds left",
            device.name,
            remaining.as_secs()
        );
        sleep_fn(options.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reboot::fsm::RebootState;
    use crate::testkit::{ScriptedChannel, ScriptedProbe};
    use inventory_model::DeviceRecord;

    fn device() -> Device {
        let record: DeviceRecord = serde_json::from_str(
            r#"{"name": "sw1", "primary_image": "isr-v2.bin"}"#,
        )
        .unwrap();
        Device::new(&record)
    }

    fn rebooted_device() -> Device {
        let mut device = device();
        device.reboot.process(RebootEvent::CommitConfig).unwrap();
        device.reboot.process(RebootEvent::IssueReboot).unwrap();
        device
    }

    #[tokio::test]
    async fn test_commit_and_reboot_advance_fsm() {
        let mut device = device();
        let channel = ScriptedChannel::new();
        channel.respond("reload", "Proceed with reload? [confirm]");

        commit_config(&mut device, &channel).await.unwrap();
        assert_eq!(device.reboot.state(), &RebootState::ConfigSaved);

        issue_reboot(&mut device, &channel).await.unwrap();
        assert_eq!(device.reboot.state(), &RebootState::RebootIssued);
        assert!(channel.transcript().contains(&"<close>".to_string()));
    }

    #[tokio::test]
    async fn test_reboot_tolerates_dropped_acknowledgment() {
        let mut device = device();
        device.reboot.process(RebootEvent::CommitConfig).unwrap();

        let channel = ScriptedChannel::new();
        channel.respond("reload", "Proceed with reload? [confirm]");
        channel.fail_on("");

        issue_reboot(&mut device, &channel).await.unwrap();
        assert_eq!(device.reboot.state(), &RebootState::RebootIssued);
    }

    #[tokio::test]
    async fn test_recovery_after_n_failures() {
        let mut device = rebooted_device();
        let probe = ScriptedProbe::down_for(3);
        let options = MonitorOptions::default();

        let recovery = await_recovery(&mut device, &probe, &options, |_| async {})
            .await
            .unwrap();

        assert_eq!(recovery.downtime, Duration::from_secs(15));
        assert_eq!(probe.calls(), 4);
        assert_eq!(device.reboot.state(), &RebootState::Reachable);
        assert_eq!(
            device.script_results()[0].message,
            "responding again after about 15 seconds down"
        );
    }

    #[tokio::test]
    async fn test_recovery_timeout_is_terminal() {
        let mut device = rebooted_device();
        let probe = ScriptedProbe::always_down();
        let options = MonitorOptions {
            interval: Duration::from_secs(5),
            budget: Duration::from_secs(30),
        };

        let err = await_recovery(&mut device, &probe, &options, |_| async {}).await;

        assert!(matches!(err, Err(FleetError::TimeoutFailure(_))));
        assert_eq!(probe.calls(), 6);
        assert_eq!(device.reboot.state(), &RebootState::TimedOut);
    }

    #[tokio::test]
    async fn test_recovery_out_of_order_is_state_error() {
        let mut device = device(); // still Idle
        let probe = ScriptedProbe::down_for(0);
        let options = MonitorOptions::default();

        let err = await_recovery(&mut device, &probe, &options, |_| async {}).await;
        assert!(matches!(err, Err(FleetError::StateError(_))));
    }
}
