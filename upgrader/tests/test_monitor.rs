//! Recovery monitor timing tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use fwfleet::errors::FleetError;
use fwfleet::fleet::{maintenance_pipeline, FleetExecutor, FleetOptions};
use fwfleet::reboot::{await_recovery, commit_config, issue_reboot, MonitorOptions};
use fwfleet::reboot::fsm::RebootState;

use common::{context, device, FakeChannel, FakeProbe};

#[tokio::test]
async fn test_recovery_elapsed_tracks_failed_probes() {
    let mut device = device("edge-1", "isr-v2.bin");
    let channel = FakeChannel::new();
    channel.respond("reload", "Proceed with reload? [confirm]");
    commit_config(&mut device, &channel).await.unwrap();
    issue_reboot(&mut device, &channel).await.unwrap();

    let probe = FakeProbe::down_for(7);
    let options = MonitorOptions::default();

    let recovery = await_recovery(&mut device, &probe, &options, |_| async {})
        .await
        .unwrap();

    assert_eq!(recovery.downtime, Duration::from_secs(35));
    assert_eq!(probe.calls(), 8);
    assert_eq!(device.reboot.state(), &RebootState::Reachable);
}

#[tokio::test]
async fn test_recovery_budget_allows_exactly_240_probes() {
    let mut device = device("edge-1", "isr-v2.bin");
    let channel = FakeChannel::new();
    channel.respond("reload", "Proceed with reload? [confirm]");
    commit_config(&mut device, &channel).await.unwrap();
    issue_reboot(&mut device, &channel).await.unwrap();

    let probe = FakeProbe::always_down();
    let options = MonitorOptions::default(); // 5 s interval, 1200 s budget

    let err = await_recovery(&mut device, &probe, &options, |_| async {}).await;

    assert!(matches!(err, Err(FleetError::TimeoutFailure(_))));
    assert_eq!(probe.calls(), 240);
    assert_eq!(device.reboot.state(), &RebootState::TimedOut);
}

#[tokio::test]
async fn test_maintenance_pipeline_reaches_reachable() {
    let channel = Arc::new(FakeChannel::new());
    channel.respond("reload", "Proceed with reload? [confirm]");

    // Device answers the very first probe, so the pipeline's real sleep
    // never runs
    let probe = Arc::new(FakeProbe::down_for(0));
    let fleet = vec![(
        device("edge-1", "isr-v2.bin"),
        context(Arc::clone(&channel), Arc::clone(&probe)),
    )];

    let executor = FleetExecutor::new(FleetOptions::default());
    let results = executor.run(maintenance_pipeline(), fleet).await;
    let device = &results[0];

    assert!(!device.is_failed(), "failure: {:?}", device.failure());
    assert_eq!(device.reboot.state(), &RebootState::Reachable);
    assert_eq!(probe.calls(), 1);
    assert_eq!(
        device.script_results()[0].message,
        "responding again after about 0 seconds down"
    );
    assert!(channel.transcript().contains(&"<close>".to_string()));
}

#[tokio::test]
async fn test_maintenance_timeout_marks_device_failed() {
    let channel = Arc::new(FakeChannel::new());
    channel.respond("reload", "Proceed with reload? [confirm]");

    let probe = Arc::new(FakeProbe::always_down());
    let mut ctx = context(Arc::clone(&channel), Arc::clone(&probe));
    // Tight budget so the pipeline's real sleeps stay in test scale
    ctx.monitor = MonitorOptions {
        interval: Duration::from_millis(10),
        budget: Duration::from_millis(30),
    };

    let executor = FleetExecutor::new(FleetOptions::default());
    let results = executor
        .run(maintenance_pipeline(), vec![(device("edge-1", "isr-v2.bin"), ctx)])
        .await;
    let device = &results[0];

    assert!(device.is_failed());
    assert_eq!(device.reboot.state(), &RebootState::TimedOut);
    assert_eq!(probe.calls(), 3);
    assert!(device.failure().unwrap().contains("await recovery"));
}
