//! Settings file management

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::exec::ExecOptions;
use crate::channel::probe::{PingProbe, ReachabilityProbe, TcpProbe};
use crate::errors::FleetError;
use crate::logs::LogLevel;
use crate::reboot::MonitorOptions;

/// Upgrader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Inventory file with the device records
    #[serde(default = "default_inventory")]
    pub inventory: PathBuf,

    /// Local directory holding firmware images
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Maximum concurrent command sessions
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Reachability probe configuration
    #[serde(default)]
    pub probe: ProbeSettings,

    /// Recovery monitor configuration
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Remote-exec channel configuration
    #[serde(default)]
    pub exec: ExecSettings,
}

fn default_inventory() -> PathBuf {
    PathBuf::from("inventory.json")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_concurrency() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            inventory: default_inventory(),
            image_dir: default_image_dir(),
            concurrency: default_concurrency(),
            probe: ProbeSettings::default(),
            monitor: MonitorSettings::default(),
            exec: ExecSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; a missing file means defaults
    pub async fn load(path: &Path) -> Result<Self, FleetError> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(FleetError::ConfigError(format!(
                "unable to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Which liveness probe to use after a reload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// `ping` (ICMP echo) or `tcp` (single connect)
    #[serde(default = "default_probe_kind")]
    pub kind: String,

    /// Port for the tcp probe
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
}

fn default_probe_kind() -> String {
    "ping".to_string()
}

fn default_tcp_port() -> u16 {
    22
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            kind: default_probe_kind(),
            tcp_port: default_tcp_port(),
        }
    }
}

impl ProbeSettings {
    /// Build the configured probe
    pub fn build(&self) -> Result<Arc<dyn ReachabilityProbe>, FleetError> {
        match self.kind.as_str() {
            "ping" => Ok(Arc::new(PingProbe)),
            "tcp" => Ok(Arc::new(TcpProbe::new(self.tcp_port))),
            other => Err(FleetError::ConfigError(format!(
                "unknown probe kind '{}'",
                other
            ))),
        }
    }
}

/// Recovery monitor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Seconds between probes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Total seconds allowed for recovery
    #[serde(default = "default_budget_secs")]
    pub budget_secs: u64,
}

fn default_interval_secs() -> u64 {
    5
}

fn default_budget_secs() -> u64 {
    1200
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            budget_secs: default_budget_secs(),
        }
    }
}

impl From<&MonitorSettings> for MonitorOptions {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.interval_secs),
            budget: Duration::from_secs(settings.budget_secs),
        }
    }
}

/// Remote-exec channel templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecSettings {
    #[serde(default = "default_command_template")]
    pub command_template: Vec<String>,

    #[serde(default = "default_transfer_template")]
    pub transfer_template: Vec<String>,

    #[serde(default = "default_save_command")]
    pub save_command: String,
}

fn default_command_template() -> Vec<String> {
    ExecOptions::default().command_template
}

fn default_transfer_template() -> Vec<String> {
    ExecOptions::default().transfer_template
}

fn default_save_command() -> String {
    ExecOptions::default().save_command
}

impl Default for ExecSettings {
    fn default() -> Self {
        let options = ExecOptions::default();
        Self {
            command_template: options.command_template,
            transfer_template: options.transfer_template,
            save_command: options.save_command,
        }
    }
}

impl From<&ExecSettings> for ExecOptions {
    fn from(settings: &ExecSettings) -> Self {
        Self {
            command_template: settings.command_template.clone(),
            transfer_template: settings.transfer_template.clone(),
            save_command: settings.save_command.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_document() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.concurrency, 10);
        assert_eq!(settings.monitor.interval_secs, 5);
        assert_eq!(settings.monitor.budget_secs, 1200);
        assert_eq!(settings.probe.kind, "ping");
    }

    #[test]
    fn test_monitor_settings_into_options() {
        let settings = MonitorSettings {
            interval_secs: 2,
            budget_secs: 60,
        };
        let options = MonitorOptions::from(&settings);
        assert_eq!(options.interval, Duration::from_secs(2));
        assert_eq!(options.budget, Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_probe_kind_is_config_error() {
        let probe = ProbeSettings {
            kind: "carrier-pigeon".to_string(),
            tcp_port: 22,
        };
        assert!(matches!(probe.build(), Err(FleetError::ConfigError(_))));
    }
}
