//! Result reporting

use chrono::Local;
use colored::Colorize;

use crate::device::{Device, Severity};

/// Consumer of per-device upgrade reports
pub trait ResultSink {
    /// Publish one device's ordered findings
    fn publish(&self, device: &Device);

    /// Called once after every device has been published
    fn finish(&self, devices: &[Device]) {
        let _ = devices;
    }
}

/// Renders reports to the terminal, one block per device
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn publish(&self, device: &Device) {
        println!("{}", format!("\n{}:", device.name).blue());
        println!("{}", "-".repeat(20).blue());

        for record in device.script_results() {
            match record.severity {
                Severity::Ok => println!("{}", record.message.green()),
                Severity::Warn => {
                    println!("{}", format!("***** WARNING ***** {}", record.message).red())
                }
            }
        }

        if let Some(failure) = device.failure() {
            println!("{}", format!("***** FAILED ***** {}", failure).red());
        }
    }

    fn finish(&self, devices: &[Device]) {
        let failed = devices.iter().filter(|d| d.is_failed()).count();
        let line = format!(
            "\n{} devices, {} ok, {} failed ({})",
            devices.len(),
            devices.len() - failed,
            failed,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        if failed == 0 {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }
    }
}

/// Publish every device through `sink`, then its summary
pub fn publish_all(sink: &dyn ResultSink, devices: &[Device]) {
    for device in devices {
        sink.publish(device);
    }
    sink.finish(devices);
}
