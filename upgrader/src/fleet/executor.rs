//! Fleet-wide pipeline execution
//!
//! One task per device, strictly sequential steps within a device, bounded
//! concurrency for command sessions across the fleet. Failure isolation is
//! the core contract: a failed device skips its remaining steps, everyone
//! else keeps going.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::device::Device;
use crate::fleet::step::{Pipeline, StepContext};

/// Fleet executor options
#[derive(Debug, Clone)]
pub struct FleetOptions {
    /// Maximum concurrent command sessions across the fleet
    pub concurrency: usize,
}

impl Default for FleetOptions {
    fn default() -> Self {
        Self { concurrency: 10 }
    }
}

type HostFilter = Arc<dyn Fn(&Device) -> bool + Send + Sync>;

/// Runs a pipeline across all devices with bounded concurrency
pub struct FleetExecutor {
    options: FleetOptions,
    filter: Option<HostFilter>,
}

impl FleetExecutor {
    pub fn new(options: FleetOptions) -> Self {
        Self {
            options,
            filter: None,
        }
    }

    /// Only run steps on devices matching `filter`. Applied by the
    /// executor before every step, never baked into the steps themselves.
    pub fn with_host_filter(
        mut self,
        filter: impl Fn(&Device) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Convenience filter: only the named hosts
    pub fn limit_hosts(self, names: &[String]) -> Self {
        let names: HashSet<String> = names.iter().cloned().collect();
        self.with_host_filter(move |device| names.contains(&device.name))
    }

    /// Run `pipeline` over the fleet and return the devices in input order
    pub async fn run(
        &self,
        pipeline: Pipeline,
        fleet: Vec<(Device, StepContext)>,
    ) -> Vec<Device> {
        let run_id = Uuid::new_v4();
        info!(
            "run {}: pipeline '{}' over {} devices, {} concurrent sessions",
            run_id,
            pipeline.name(),
            fleet.len(),
            self.options.concurrency
        );

        let pipeline = Arc::new(pipeline);
        let sessions = Arc::new(Semaphore::new(self.options.concurrency));
        let mut handles = Vec::with_capacity(fleet.len());

        for (device, ctx) in fleet {
            let pipeline = Arc::clone(&pipeline);
            let sessions = Arc::clone(&sessions);
            let filter = self.filter.clone();

            // Kept outside the task so a panicked worker still yields a
            // reportable device.
            let fallback = device.clone();

            let handle = tokio::spawn(async move {
                run_device(device, ctx, pipeline, sessions, filter).await
            });
            handles.push((fallback, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (mut fallback, handle) in handles {
            match handle.await {
                Ok(device) => results.push(device),
                Err(e) => {
                    error!("run {}: device worker panicked: {}", run_id, e);
                    fallback.mark_failed(format!("worker panicked: {}", e));
                    results.push(fallback);
                }
            }
        }

        let failed = results.iter().filter(|d| d.is_failed()).count();
        info!(
            "run {}: pipeline '{}' finished, {} ok, {} failed",
            run_id,
            pipeline.name(),
            results.len() - failed,
            failed
        );
        results
    }
}

async fn run_device(
    mut device: Device,
    ctx: StepContext,
    pipeline: Arc<Pipeline>,
    sessions: Arc<Semaphore>,
    filter: Option<HostFilter>,
) -> Device {
    for step in pipeline.steps() {
        // First failure wins; everything after it is skipped.
        if device.is_failed() {
            debug!("{}: skipping '{}' after earlier failure", device.name, step.name());
            continue;
        }

        if let Some(filter) = &filter {
            if !filter(&device) {
                debug!("{}: excluded from '{}'", device.name, step.name());
                continue;
            }
        }

        if !step.is_enabled(&device) {
            debug!("{}: step '{}' not applicable", device.name, step.name());
            continue;
        }

        // Long-polling steps run permitless so they cannot starve the
        // fleet; everything touching a command session is bounded.
        let _permit = if step.requires_session() {
            match Arc::clone(&sessions).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    device.mark_failed("executor session pool closed");
                    continue;
                }
            }
        } else {
            None
        };

        info!("{}: step '{}'", device.name, step.name());
        if let Err(e) = step.execute(&mut device, &ctx).await {
            error!("{}: step '{}' failed: {}", device.name, step.name(), e);
            device.mark_failed(format!("{}: {}", step.name(), e));
        }
    }

    device
}
