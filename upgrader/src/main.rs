//! fwfleet - Entry Point
//!
//! Firmware upgrade orchestrator for a fleet of network devices. Runs the
//! preparation pass (inventory, cleanup, deploy, verify) or the maintenance
//! pass (commit, reload, watch recovery) over every device in the inventory.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use fwfleet::channel::exec::{ExecChannel, ExecOptions};
use fwfleet::device::Device;
use fwfleet::errors::FleetError;
use fwfleet::fleet::{
    maintenance_pipeline, prepare_pipeline, publish_all, ConsoleSink, FleetExecutor,
    FleetOptions, Pipeline, StepContext,
};
use fwfleet::inventory::load_inventory;
use fwfleet::logs::{init_logging, LogOptions};
use fwfleet::reboot::MonitorOptions;
use fwfleet::settings::Settings;
use fwfleet::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!(
            "{}",
            serde_json::to_string_pretty(&version_info()).unwrap()
        );
        return;
    }

    // Retrieve the settings file
    let config_path = cli_args
        .get("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fwfleet.json"));
    let settings = match Settings::load(&config_path).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            std::process::exit(2);
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    let phase = cli_args
        .get("phase")
        .cloned()
        .unwrap_or_else(|| "prepare".to_string());
    let limit: Option<Vec<String>> = cli_args
        .get("limit")
        .map(|hosts| hosts.split(',').map(|h| h.trim().to_string()).collect());

    info!("Running fwfleet phase '{}' with {:?}", phase, config_path);
    match run(&settings, &phase, limit).await {
        Ok(all_ok) => {
            if !all_ok {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to run the upgrade pass: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(
    settings: &Settings,
    phase: &str,
    limit: Option<Vec<String>>,
) -> Result<bool, FleetError> {
    let pipeline = pipeline_for(phase)?;

    let records = load_inventory(&settings.inventory).await?;
    let probe = settings.probe.build()?;
    let monitor = MonitorOptions::from(&settings.monitor);
    let exec_options = ExecOptions::from(&settings.exec);

    let fleet: Vec<(Device, StepContext)> = records
        .iter()
        .map(|record| {
            let device = Device::new(record);
            let ctx = StepContext {
                channel: Arc::new(ExecChannel::new(record.address(), exec_options.clone())),
                probe: Arc::clone(&probe),
                image_dir: settings.image_dir.clone(),
                monitor: monitor.clone(),
            };
            (device, ctx)
        })
        .collect();

    let mut executor = FleetExecutor::new(FleetOptions {
        concurrency: settings.concurrency,
    });
    if let Some(hosts) = limit {
        executor = executor.limit_hosts(&hosts);
    }

    let results = executor.run(pipeline, fleet).await;
    publish_all(&ConsoleSink, &results);

    Ok(results.iter().all(|device| !device.is_failed()))
}

fn pipeline_for(phase: &str) -> Result<Pipeline, FleetError> {
    match phase {
        "prepare" => Ok(prepare_pipeline()),
        "reboot" | "maintenance" => Ok(maintenance_pipeline()),
        other => Err(FleetError::ConfigError(format!(
            "unknown phase '{}', expected 'prepare' or 'reboot'",
            other
        ))),
    }
}
