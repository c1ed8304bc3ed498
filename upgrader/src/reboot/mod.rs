//! Reboot and recovery monitoring

pub mod fsm;
pub mod monitor;

pub use monitor::{await_recovery, commit_config, issue_reboot, MonitorOptions, Recovery};
