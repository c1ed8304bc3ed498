//! Reachability probes
//!
//! Rebooting a device severs its command channel, so recovery is observed
//! out-of-band: a single liveness attempt with a short internal timeout.
//! Any non-success outcome counts as still-down; transient packet loss is
//! indistinguishable from host-unreachable here.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::debug;

/// Per-probe timeout.
const PROBE_TIMEOUT_SECS: u64 = 2;

/// A single-attempt liveness check against one address
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// One attempt; true when the device answered within the timeout
    async fn probe(&self, address: &str) -> bool;
}

/// ICMP echo probe via the system `ping` binary, one request per attempt
#[derive(Debug, Clone, Default)]
pub struct PingProbe;

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn probe(&self, address: &str) -> bool {
        let status = Command::new("ping")
            .args(["-c", "1", "-W", "2", address])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("ping {} failed to spawn: {}", address, e);
                false
            }
        }
    }
}

/// TCP connect probe, for networks that filter ICMP
#[derive(Debug, Clone)]
pub struct TcpProbe {
    port: u16,
}

impl TcpProbe {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        // Management plane is SSH on these devices
        Self { port: 22 }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self, address: &str) -> bool {
        let timeout = Duration::from_secs(PROBE_TIMEOUT_SECS);

        // Resolve bare IPs without touching DNS; host names go through
        // the runtime's resolver inside the same timeout.
        if let Ok(ip) = address.parse::<IpAddr>() {
            let addr = SocketAddr::new(ip, self.port);
            return matches!(
                tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
                Ok(Ok(_))
            );
        }

        let target = format!("{}:{}", address, self.port);
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect(target)).await,
            Ok(Ok(_))
        )
    }
}
