//! TCP reachability probe

use std::fmt;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

/// Default connect timeout in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Why a probe did not establish a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Timeout,
    Io(String),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Timeout => write!(f, "connect timed out"),
            ProbeFailure::Io(e) => write!(f, "{}", e),
        }
    }
}

/// Measures how long a TCP connect to an endpoint takes
#[derive(Debug, Clone)]
pub struct ReachabilityProber {
    timeout: Duration,
}

impl ReachabilityProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connect to `ip:port` and return the connect-phase duration.
    ///
    /// The connection is closed as soon as it is established.
    pub async fn probe(&self, ip: &str, port: u16) -> Result<Duration, ProbeFailure> {
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, TcpStream::connect((ip, port))).await {
            Ok(Ok(stream)) => {
                let elapsed = start.elapsed();
                drop(stream);
                debug!(ip, port, ?elapsed, "connected");
                Ok(elapsed)
            }
            Ok(Err(e)) => Err(ProbeFailure::Io(e.to_string())),
            Err(_) => Err(ProbeFailure::Timeout),
        }
    }
}

impl Default for ReachabilityProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = ReachabilityProber::default();
        let elapsed = prober.probe("127.0.0.1", port).await.unwrap();
        assert!(elapsed < prober.timeout());
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = ReachabilityProber::default();
        let result = prober.probe("127.0.0.1", port).await;
        assert!(matches!(result, Err(ProbeFailure::Io(_))));
    }

    #[tokio::test]
    async fn test_connect_times_out() {
        let (_listener, _queued, port) = testing::saturated_listener().await;

        let prober = ReachabilityProber::new(Duration::from_millis(200));
        let start = Instant::now();
        let result = prober.probe("127.0.0.1", port).await;
        assert_eq!(result, Err(ProbeFailure::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_probe_unresolvable_host() {
        let prober = ReachabilityProber::new(Duration::from_secs(2));
        let result = prober.probe("no-such-host.invalid", 80).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_probe_failure_display() {
        assert_eq!(ProbeFailure::Timeout.to_string(), "connect timed out");
        assert_eq!(
            ProbeFailure::Io("connection refused".to_string()).to_string(),
            "connection refused"
        );
    }
}
