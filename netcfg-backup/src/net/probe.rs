//! TCP reachability probe run before any session is opened.

use std::future::Future;
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Decides whether a device is worth opening a session to.
pub trait Probe {
    /// Never fails; every error counts as "unreachable".
    fn is_reachable(&self, address: &str) -> impl Future<Output = bool> + Send;
}

/// Tries a TCP connect up to `attempts` times, each bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    pub port: u16,
    pub attempts: u32,
    pub timeout: Duration,
}

impl TcpProbe {
    pub fn new(port: u16, attempts: u32, timeout: Duration) -> Self {
        Self {
            port,
            attempts,
            timeout,
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(22, 2, Duration::from_secs(5))
    }
}

/// `host:port`, bracketing bare IPv6 addresses.
pub fn socket_target(address: &str, port: u16) -> String {
    if address.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]:{}", address, port)
    } else {
        format!("{}:{}", address, port)
    }
}

impl Probe for TcpProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        let target = socket_target(address, self.port);

        for attempt in 1..=self.attempts {
            match tokio::time::timeout(self.timeout, TcpStream::connect(&target)).await {
                Ok(Ok(_stream)) => return true,
                Ok(Err(e)) => debug!(%target, attempt, "Probe attempt failed: {}", e),
                Err(_) => debug!(%target, attempt, "Probe attempt timed out"),
            }
        }

        false
    }
}
